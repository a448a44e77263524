use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use poi_core::{Category, ElementKind, GeoPoint, RawRecord};
use poi_storage::{FetchError, HttpClientConfig, HttpFetcher, RetryDisposition};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("source unavailable: {reason}")]
    Unavailable { reason: String, retryable: bool },
    #[error("source timed out after {after:?}")]
    Timeout { after: Duration },
}

impl SourceError {
    pub fn is_retryable(&self) -> bool {
        match self {
            SourceError::Unavailable { retryable, .. } => *retryable,
            SourceError::Timeout { .. } => true,
        }
    }

    fn permanent(reason: impl Into<String>) -> Self {
        SourceError::Unavailable {
            reason: reason.into(),
            retryable: false,
        }
    }
}

impl From<FetchError> for SourceError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::Timeout { after, .. } => SourceError::Timeout { after },
            other => SourceError::Unavailable {
                retryable: other.disposition() == RetryDisposition::Retryable,
                reason: other.to_string(),
            },
        }
    }
}

/// Anything that can answer a category query with raw tagged records.
#[async_trait]
pub trait GeoSource: Send + Sync {
    fn name(&self) -> &'static str;

    async fn fetch(&self, category: Category, query: &str) -> Result<Vec<RawRecord>, SourceError>;
}

#[derive(Debug, Deserialize)]
struct OverpassResponse {
    #[serde(default)]
    elements: Vec<OverpassElement>,
}

#[derive(Debug, Deserialize)]
struct OverpassElement {
    #[serde(rename = "type")]
    kind: String,
    id: i64,
    lat: Option<f64>,
    lon: Option<f64>,
    center: Option<LatLon>,
    #[serde(default)]
    tags: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct LatLon {
    lat: f64,
    lon: f64,
}

impl OverpassElement {
    fn into_record(self) -> RawRecord {
        let (kind, external_id, coordinates) = match self.kind.as_str() {
            "node" => (
                ElementKind::Point,
                self.id.to_string(),
                self.lat.zip(self.lon).map(|(lat, lon)| GeoPoint::new(lon, lat)),
            ),
            other => (
                ElementKind::Area,
                format!("{other}-{}", self.id),
                self.center.map(|c| GeoPoint::new(c.lon, c.lat)),
            ),
        };
        RawRecord {
            external_id,
            kind,
            coordinates,
            tags: self.tags,
        }
    }
}

/// Decode an Overpass JSON response into raw records. Nodes keep their bare numeric id;
/// ways and relations are prefixed with their element type so ids never collide.
pub fn parse_elements(body: &[u8]) -> Result<Vec<RawRecord>, serde_json::Error> {
    let response: OverpassResponse = serde_json::from_slice(body)?;
    Ok(response
        .elements
        .into_iter()
        .map(OverpassElement::into_record)
        .collect())
}

/// Live geodata API client. One POST per call; retries belong to the caller.
#[derive(Debug, Clone)]
pub struct OverpassClient {
    fetcher: HttpFetcher,
    endpoint: String,
}

impl OverpassClient {
    pub fn new(endpoint: impl Into<String>, config: HttpClientConfig) -> anyhow::Result<Self> {
        Ok(Self {
            fetcher: HttpFetcher::new(config)?,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl GeoSource for OverpassClient {
    fn name(&self) -> &'static str {
        "overpass"
    }

    async fn fetch(&self, category: Category, query: &str) -> Result<Vec<RawRecord>, SourceError> {
        let response = self.fetcher.post_text(&self.endpoint, query.to_string()).await?;
        let records = parse_elements(&response.body)
            .map_err(|err| SourceError::permanent(format!("undecodable response body: {err}")))?;
        info!(%category, records = records.len(), "source records received");
        Ok(records)
    }
}

/// Offline source answering from `<dir>/<category>.json` captures of real responses.
#[derive(Debug, Clone)]
pub struct FixtureSource {
    dir: PathBuf,
}

impl FixtureSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl GeoSource for FixtureSource {
    fn name(&self) -> &'static str {
        "fixtures"
    }

    async fn fetch(&self, category: Category, _query: &str) -> Result<Vec<RawRecord>, SourceError> {
        let path = self.dir.join(format!("{}.json", category.as_str()));
        let body = tokio::fs::read(&path)
            .await
            .map_err(|err| SourceError::permanent(format!("reading {}: {err}", path.display())))?;
        let records = parse_elements(&body)
            .map_err(|err| SourceError::permanent(format!("parsing {}: {err}", path.display())))?;
        debug!(
            %category,
            records = records.len(),
            path = %path.display(),
            "fixture records loaded"
        );
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn sample_response() -> serde_json::Value {
        json!({
            "version": 0.6,
            "elements": [
                {
                    "type": "node",
                    "id": 101,
                    "lat": 22.5601,
                    "lon": 88.3512,
                    "tags": { "tourism": "hotel", "name": "Grand Hotel" }
                },
                {
                    "type": "way",
                    "id": 2001,
                    "center": { "lat": 22.55, "lon": 88.35 },
                    "tags": { "tourism": "hostel" }
                },
                { "type": "way", "id": 2002 }
            ]
        })
    }

    fn client_for(server: &MockServer, timeout: Duration) -> OverpassClient {
        OverpassClient::new(
            format!("{}/api/interpreter", server.uri()),
            HttpClientConfig {
                timeout,
                user_agent: Some("poi-ingest-tests".into()),
            },
        )
        .expect("client")
    }

    #[tokio::test]
    async fn posts_query_and_parses_elements() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/interpreter"))
            .and(body_string_contains("[out:json]"))
            .respond_with(ResponseTemplate::new(200).set_body_json(sample_response()))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, Duration::from_secs(5));
        let records = client
            .fetch(Category::Lodging, "[out:json][timeout:25];\n();\nout center;\n")
            .await
            .expect("records");

        assert_eq!(records.len(), 3);
        assert_eq!(records[0].external_id, "101");
        assert_eq!(records[0].kind, ElementKind::Point);
        assert_eq!(records[0].coordinates, Some(GeoPoint::new(88.3512, 22.5601)));
        assert_eq!(records[1].external_id, "way-2001");
        assert_eq!(records[1].kind, ElementKind::Area);
        assert_eq!(records[1].coordinates, Some(GeoPoint::new(88.35, 22.55)));
        assert!(records[2].coordinates.is_none());
        assert!(records[2].tags.is_empty());
    }

    #[tokio::test]
    async fn server_errors_are_retryable_unavailability() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(504))
            .mount(&server)
            .await;

        let err = client_for(&server, Duration::from_secs(5))
            .fetch(Category::Dining, "q")
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::Unavailable { retryable: true, .. }));
    }

    #[tokio::test]
    async fn bad_requests_are_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400))
            .mount(&server)
            .await;

        let err = client_for(&server, Duration::from_secs(5))
            .fetch(Category::Dining, "q")
            .await
            .unwrap_err();
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn slow_responses_hit_the_deadline() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(sample_response())
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let err = client_for(&server, Duration::from_millis(200))
            .fetch(Category::Sports, "q")
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::Timeout { .. }));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn garbage_bodies_are_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>rate limited</html>"))
            .mount(&server)
            .await;

        let err = client_for(&server, Duration::from_secs(5))
            .fetch(Category::Attractions, "q")
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::Unavailable { retryable: false, .. }));
    }

    #[tokio::test]
    async fn fixture_source_reads_category_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(
            dir.path().join("lodging.json"),
            serde_json::to_vec(&sample_response()).unwrap(),
        )
        .unwrap();
        let source = FixtureSource::new(dir.path());

        let records = source.fetch(Category::Lodging, "").await.unwrap();
        assert_eq!(records.len(), 3);
        let missing = source.fetch(Category::Dining, "").await.unwrap_err();
        assert!(!missing.is_retryable());
    }
}
