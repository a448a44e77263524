use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use poi_core::{Category, NormalizedEntity};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use tracing::info;

use crate::datastore::{Collection, Datastore, DocumentFilter, StoreError};

/// Postgres-backed store: every category shares `poi_documents`, partitioned by `collection`.
#[derive(Debug, Clone)]
pub struct PgDatastore {
    pool: PgPool,
}

impl PgDatastore {
    /// Open the pool and apply pending migrations.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(4)
            .acquire_timeout(Duration::from_secs(10))
            .connect(database_url)
            .await
            .map_err(|err| StoreError::Connection(err.to_string()))?;
        sqlx::migrate!("../../migrations")
            .run(&pool)
            .await
            .map_err(|err| StoreError::Connection(format!("running migrations: {err}")))?;
        info!("datastore connected and migrated");
        Ok(Self { pool })
    }
}

impl Datastore for PgDatastore {
    fn collection(&self, category: Category) -> Arc<dyn Collection> {
        Arc::new(PgCollection {
            pool: self.pool.clone(),
            name: category.collection(),
        })
    }
}

struct PgCollection {
    pool: PgPool,
    name: &'static str,
}

fn push_scope<'a>(
    qb: &mut QueryBuilder<'a, Postgres>,
    collection: &'a str,
    filter: &DocumentFilter,
) {
    qb.push(" WHERE collection = ").push_bind(collection);
    match filter {
        DocumentFilter::All => {}
        DocumentFilter::Status(status) => {
            qb.push(" AND status = ").push_bind(status.as_str());
        }
        DocumentFilter::ExternalIds(ids) => {
            qb.push(" AND external_id = ANY(").push_bind(ids.clone()).push(")");
        }
    }
}

#[async_trait]
impl Collection for PgCollection {
    fn name(&self) -> &str {
        self.name
    }

    async fn find(&self, filter: &DocumentFilter) -> Result<Vec<NormalizedEntity>, StoreError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT document FROM poi_documents");
        push_scope(&mut qb, self.name, filter);
        qb.push(" ORDER BY id");
        let rows = qb
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(|err| StoreError::query(self.name, err))?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let document: serde_json::Value = row
                .try_get("document")
                .map_err(|err| StoreError::query(self.name, err))?;
            out.push(serde_json::from_value(document)?);
        }
        Ok(out)
    }

    async fn existing_external_ids(&self, ids: &[String]) -> Result<HashSet<String>, StoreError> {
        if ids.is_empty() {
            return Ok(HashSet::new());
        }
        let rows = sqlx::query(
            r#"
            SELECT external_id
              FROM poi_documents
             WHERE collection = $1
               AND external_id = ANY($2)
            "#,
        )
        .bind(self.name)
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|err| StoreError::query(self.name, err))?;

        let mut out = HashSet::with_capacity(rows.len());
        for row in rows {
            let id: String = row
                .try_get("external_id")
                .map_err(|err| StoreError::query(self.name, err))?;
            out.insert(id);
        }
        Ok(out)
    }

    async fn insert_many(&self, entities: &[NormalizedEntity]) -> Result<usize, StoreError> {
        if entities.is_empty() {
            return Ok(0);
        }
        let documents = entities
            .iter()
            .map(|entity| serde_json::to_value(entity).map(|doc| (entity.envelope(), doc)))
            .collect::<Result<Vec<_>, _>>()?;

        let mut qb = QueryBuilder::<Postgres>::new(
            "INSERT INTO poi_documents \
             (collection, external_id, slug, name, status, featured, promoted, \
             longitude, latitude, document) ",
        );
        qb.push_values(documents, |mut row, (envelope, document)| {
            row.push_bind(self.name)
                .push_bind(envelope.external_id.clone())
                .push_bind(envelope.slug.clone())
                .push_bind(envelope.name.clone())
                .push_bind(envelope.status.as_str())
                .push_bind(envelope.featured)
                .push_bind(envelope.promoted)
                .push_bind(envelope.location.longitude())
                .push_bind(envelope.location.latitude())
                .push_bind(document);
        });

        // Single statement: Postgres rejects the whole batch if any row violates a constraint.
        let result = qb
            .build()
            .execute(&self.pool)
            .await
            .map_err(|err| StoreError::query(self.name, err))?;
        Ok(result.rows_affected() as usize)
    }

    async fn insert_one(&self, entity: &NormalizedEntity) -> Result<(), StoreError> {
        self.insert_many(std::slice::from_ref(entity)).await.map(|_| ())
    }

    async fn delete_many(&self, filter: &DocumentFilter) -> Result<u64, StoreError> {
        let mut qb = QueryBuilder::<Postgres>::new("DELETE FROM poi_documents");
        push_scope(&mut qb, self.name, filter);
        let result = qb
            .build()
            .execute(&self.pool)
            .await
            .map_err(|err| StoreError::query(self.name, err))?;
        Ok(result.rows_affected())
    }

    async fn count_documents(&self, filter: &DocumentFilter) -> Result<u64, StoreError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) AS count FROM poi_documents");
        push_scope(&mut qb, self.name, filter);
        let row = qb
            .build()
            .fetch_one(&self.pool)
            .await
            .map_err(|err| StoreError::query(self.name, err))?;
        let count: i64 = row
            .try_get("count")
            .map_err(|err| StoreError::query(self.name, err))?;
        Ok(count.max(0) as u64)
    }
}
