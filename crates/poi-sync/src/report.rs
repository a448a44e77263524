use std::fmt::Write as _;
use std::time::Duration;

use chrono::{DateTime, Utc};
use poi_core::{Category, LoadStatistics};
use poi_storage::StoredSnapshot;
use serde::{Serialize, Serializer};
use uuid::Uuid;

use crate::pipeline::{CategoryError, RunMode};

/// Everything one category contributed to a run.
#[derive(Debug, Serialize)]
pub struct CategoryOutcome {
    pub category: Category,
    #[serde(flatten, serialize_with = "serialize_result")]
    pub result: Result<LoadStatistics, CategoryError>,
    /// Raw records fetched, synthetic entities generated, or snapshot entities read.
    pub received: usize,
    pub discarded: usize,
    pub snapshot: Option<StoredSnapshot>,
    pub snapshot_missing: bool,
}

impl CategoryOutcome {
    pub fn new(category: Category) -> Self {
        Self {
            category,
            result: Ok(LoadStatistics::default()),
            received: 0,
            discarded: 0,
            snapshot: None,
            snapshot_missing: false,
        }
    }

    /// Statistics for a completed category. A failed load keeps what its earlier batches
    /// stored; any other failure counts as zero.
    pub fn stats(&self) -> LoadStatistics {
        stats_of(&self.result)
    }

    pub fn is_failed(&self) -> bool {
        self.result.is_err()
    }
}

fn stats_of(result: &Result<LoadStatistics, CategoryError>) -> LoadStatistics {
    match result {
        Ok(stats) => *stats,
        Err(CategoryError::DuplicateCheck { partial, .. }) => *partial,
        Err(_) => LoadStatistics::default(),
    }
}

#[derive(Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum ResultRecord {
    Completed { stats: LoadStatistics },
    Failed { stats: LoadStatistics, error: String },
}

fn serialize_result<S: Serializer>(
    result: &Result<LoadStatistics, CategoryError>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    let stats = stats_of(result);
    match result {
        Ok(_) => ResultRecord::Completed { stats },
        Err(err) => ResultRecord::Failed {
            stats,
            error: err.to_string(),
        },
    }
    .serialize(serializer)
}

fn serialize_millis<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(duration.as_millis() as u64)
}

/// One run, serialized as-is into `reports/<run_id>.json`.
#[derive(Debug, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub mode: RunMode,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    #[serde(rename = "duration_ms", serialize_with = "serialize_millis")]
    pub duration: Duration,
    /// Pending records removed before ingesting; only set by fresh-ingest.
    pub purged: Option<u64>,
    #[serde(rename = "categories")]
    pub outcomes: Vec<CategoryOutcome>,
}

impl RunReport {
    pub fn totals(&self) -> LoadStatistics {
        self.outcomes.iter().map(CategoryOutcome::stats).sum()
    }

    pub fn outcome(&self, category: Category) -> Option<&CategoryOutcome> {
        self.outcomes.iter().find(|o| o.category == category)
    }

    pub fn failed_categories(&self) -> impl Iterator<Item = &CategoryOutcome> {
        self.outcomes.iter().filter(|o| o.is_failed())
    }

    pub fn all_failed(&self) -> bool {
        !self.outcomes.is_empty() && self.outcomes.iter().all(CategoryOutcome::is_failed)
    }
}

fn percent(rate: f64) -> String {
    format!("{:.1}%", rate * 100.0)
}

/// Operator-facing summary of a run.
pub fn render(report: &RunReport) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = writeln!(out, "POI ingest run {} ({})", report.run_id, report.mode);
    let _ = writeln!(
        out,
        "started {} | finished {} | took {:.2}s",
        report.started_at.format("%Y-%m-%d %H:%M:%S UTC"),
        report.finished_at.format("%Y-%m-%d %H:%M:%S UTC"),
        report.duration.as_secs_f64()
    );
    if let Some(purged) = report.purged {
        let _ = writeln!(out, "purged {purged} pending record(s) before ingesting");
    }
    out.push('\n');

    let _ = writeln!(
        out,
        "{:<12} {:>7} {:>9} {:>7} {:>8} {:>8} {:>8}",
        "category", "total", "inserted", "failed", "skipped", "pending", "success"
    );
    for outcome in &report.outcomes {
        match &outcome.result {
            Ok(stats) => {
                let _ = writeln!(
                    out,
                    "{:<12} {:>7} {:>9} {:>7} {:>8} {:>8} {:>8}",
                    outcome.category.as_str(),
                    stats.total,
                    stats.succeeded,
                    stats.failed,
                    stats.skipped,
                    stats.pending,
                    percent(stats.success_rate())
                );
            }
            Err(err) => {
                let _ = writeln!(out, "{:<12} FAILED: {err}", outcome.category.as_str());
            }
        }
    }
    let totals = report.totals();
    let _ = writeln!(
        out,
        "{:<12} {:>7} {:>9} {:>7} {:>8} {:>8} {:>8}",
        "all",
        totals.total,
        totals.succeeded,
        totals.failed,
        totals.skipped,
        totals.pending,
        percent(totals.success_rate())
    );

    let recommendations = recommendations(report);
    if !recommendations.is_empty() {
        out.push_str("\nRecommendations:\n");
        for line in recommendations {
            let _ = writeln!(out, "  - {line}");
        }
    }
    out
}

pub fn recommendations(report: &RunReport) -> Vec<String> {
    let totals = report.totals();
    let mut out = Vec::new();

    if totals.pending > 0 {
        out.push(format!(
            "{} records need review before they become publicly visible",
            totals.pending
        ));
    }
    if totals.failed > 0 {
        out.push(format!(
            "{} records failed to insert; see the per-record warnings in the log",
            totals.failed
        ));
    }
    for outcome in report.failed_categories() {
        if let Err(err) = &outcome.result {
            out.push(format!(
                "{} failed ({err}); re-run once the cause is resolved",
                outcome.category
            ));
        }
    }
    for outcome in report.outcomes.iter().filter(|o| o.snapshot_missing) {
        out.push(format!(
            "no snapshot for {}; run ingest-and-load to create one",
            outcome.category
        ));
    }
    if totals.total == 0 {
        out.push("no records were considered; check the query area and source availability".into());
    } else if totals.skipped == totals.total {
        out.push("every record was already stored; nothing new was loaded".into());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use poi_adapters::SourceError;
    use poi_storage::StoreError;

    fn report(outcomes: Vec<CategoryOutcome>) -> RunReport {
        let started_at = Utc::now();
        RunReport {
            run_id: Uuid::nil(),
            mode: RunMode::IngestAndLoad,
            started_at,
            finished_at: started_at,
            duration: Duration::from_millis(1_250),
            purged: None,
            outcomes,
        }
    }

    fn completed(category: Category, stats: LoadStatistics) -> CategoryOutcome {
        CategoryOutcome {
            result: Ok(stats),
            ..CategoryOutcome::new(category)
        }
    }

    #[test]
    fn empty_run_reports_zero_rate_and_no_records_hint() {
        let report = report(vec![completed(Category::Lodging, LoadStatistics::default())]);
        assert_eq!(report.totals().success_rate(), 0.0);
        assert_eq!(
            recommendations(&report),
            vec!["no records were considered; check the query area and source availability"]
        );
        assert!(render(&report).contains("0.0%"));
    }

    #[test]
    fn pending_records_need_review() {
        let report = report(vec![
            completed(Category::Lodging, LoadStatistics::considered(4).inserted(3).failed(1)),
            completed(Category::Dining, LoadStatistics::considered(2).skipped(2)),
        ]);
        let lines = recommendations(&report);
        assert_eq!(lines[0], "3 records need review before they become publicly visible");
        assert!(lines[1].starts_with("1 records failed to insert"));
        assert_eq!(lines.len(), 2);

        let text = render(&report);
        assert!(text.contains("lodging"));
        assert!(text.contains("75.0%"));
        assert!(text.contains("50.0%"));
        assert!(text.contains("took 1.25s"));
    }

    #[test]
    fn failed_categories_are_named_and_keep_partial_counts() {
        let failed = CategoryOutcome {
            result: Err(CategoryError::DuplicateCheck {
                partial: LoadStatistics::considered(2).inserted(2),
                source: StoreError::query("restaurants", "connection reset"),
            }),
            ..CategoryOutcome::new(Category::Dining)
        };
        let report = report(vec![
            completed(Category::Lodging, LoadStatistics::considered(1).inserted(1)),
            failed,
        ]);
        assert_eq!(report.outcome(Category::Dining).unwrap().stats().succeeded, 2);
        assert_eq!(report.totals().total, 3);
        assert_eq!(report.totals().pending, 3);
        assert!(!report.all_failed());
        assert!(recommendations(&report)
            .iter()
            .any(|l| l.starts_with("dining failed (duplicate check failed")));
        assert!(render(&report).contains("dining       FAILED: duplicate check failed"));

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["mode"], "ingest-and-load");
        assert_eq!(json["duration_ms"], 1_250);
        assert_eq!(json["categories"][0]["status"], "completed");
        assert_eq!(json["categories"][1]["status"], "failed");
        assert_eq!(json["categories"][1]["stats"]["succeeded"], 2);
        assert_eq!(json["categories"][1]["category"], "dining");
    }

    #[test]
    fn every_category_failing_is_flagged() {
        let report = report(vec![CategoryOutcome {
            result: Err(CategoryError::Fetch {
                attempts: 3,
                source: SourceError::Timeout {
                    after: Duration::from_secs(30),
                },
            }),
            ..CategoryOutcome::new(Category::Sports)
        }]);
        assert!(report.all_failed());
    }

    #[test]
    fn duplicate_only_runs_say_so() {
        let report = report(vec![completed(
            Category::Events,
            LoadStatistics::considered(4).skipped(4),
        )]);
        assert_eq!(
            recommendations(&report),
            vec!["every record was already stored; nothing new was loaded"]
        );
    }
}
