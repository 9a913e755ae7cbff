pub mod date_util;
pub mod error;
pub mod import;
pub mod metrics;
pub mod records;
pub mod storage;
pub mod window;

pub use error::{Error, Result};
pub use metrics::{Dashboard, Snapshot};
pub use records::{
    ActivityLog, ActivityType, FinanceEntry, PipelineItem, PipelineStatus, Targets,
};
pub use storage::Database;
pub use window::{Granularity, Period, TimeWindow, WindowSpec};

// Re-export repository types needed by the binary crate, but not the module itself
pub use storage::repository::{RecordCounts, RecordKind};

use chrono::{DateTime, Utc};
use storage::repository;

pub const TARGET_STEADY_CALL_VOLUME: &str = "targets.steady_call_volume";
pub const TARGET_AGREEMENT_RATE: &str = "targets.agreement_rate";
pub const TARGET_LISTS_OUT: &str = "targets.lists_out";

const TARGET_KEYS: [&str; 3] = [
    TARGET_STEADY_CALL_VOLUME,
    TARGET_AGREEMENT_RATE,
    TARGET_LISTS_OUT,
];

/// Wires the SQLite store to the reporting engine: loads snapshots,
/// resolves configured targets and manages configuration.
pub struct CrmKpi {
    db: Database,
}

impl CrmKpi {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    // ── Import ─────────────────────────────────────────────────────

    pub async fn import_pipeline_items(
        &self,
        items: Vec<PipelineItem>,
        replace: bool,
    ) -> Result<usize> {
        let n = self
            .db
            .writer()
            .call(move |conn| repository::insert_pipeline_items(conn, &items, replace))
            .await?;
        Ok(n)
    }

    pub async fn import_activity_logs(
        &self,
        logs: Vec<ActivityLog>,
        replace: bool,
    ) -> Result<usize> {
        let unknown = logs.iter().filter(|l| !l.activity_type.is_known()).count();
        if unknown > 0 {
            log::warn!("{unknown} activity logs have an unrecognised type and will not be counted");
        }
        let n = self
            .db
            .writer()
            .call(move |conn| repository::insert_activity_logs(conn, &logs, replace))
            .await?;
        Ok(n)
    }

    pub async fn import_finance_entries(
        &self,
        entries: Vec<FinanceEntry>,
        replace: bool,
    ) -> Result<usize> {
        let n = self
            .db
            .writer()
            .call(move |conn| repository::insert_finance_entries(conn, &entries, replace))
            .await?;
        Ok(n)
    }

    // ── Reporting ──────────────────────────────────────────────────

    /// Load every record stream, optionally scoped to a single BDR.
    pub async fn snapshot(&self, bdr: Option<&str>) -> Result<Snapshot> {
        let bdr = bdr.map(|s| s.to_string());
        let snapshot = self
            .db
            .reader()
            .call(move |conn| {
                let bdr = bdr.as_deref();
                Ok::<Snapshot, rusqlite::Error>(Snapshot {
                    pipeline_items: repository::list_pipeline_items(conn, bdr)?,
                    activity_logs: repository::list_activity_logs(conn, bdr)?,
                    finance_entries: repository::list_finance_entries(conn, bdr)?,
                })
            })
            .await?;
        log::debug!(
            "snapshot: {} pipeline items, {} activity logs, {} finance entries",
            snapshot.pipeline_items.len(),
            snapshot.activity_logs.len(),
            snapshot.finance_entries.len()
        );
        Ok(snapshot)
    }

    /// Targets from configuration. Unset targets are 0.
    pub async fn targets(&self) -> Result<Targets> {
        let config = self.config_list().await?;
        let lookup = |key: &str| -> Result<f64> {
            match config.iter().find(|(k, _)| k == key) {
                Some((_, value)) => parse_target(key, value),
                None => Ok(0.0),
            }
        };
        Ok(Targets {
            steady_call_volume: lookup(TARGET_STEADY_CALL_VOLUME)?,
            agreement_rate: lookup(TARGET_AGREEMENT_RATE)?,
            lists_out: lookup(TARGET_LISTS_OUT)?,
        })
    }

    /// Compute every report over one snapshot.
    pub async fn dashboard(
        &self,
        bdr: Option<&str>,
        now: DateTime<Utc>,
        window: &WindowSpec,
    ) -> Result<Dashboard> {
        let snapshot = self.snapshot(bdr).await?;
        let targets = self.targets().await?;
        Ok(Dashboard::compute(&snapshot, &targets, now, window))
    }

    pub async fn record_counts(&self) -> Result<RecordCounts> {
        let counts = self
            .db
            .reader()
            .call(|conn| repository::record_counts(conn))
            .await?;
        Ok(counts)
    }

    // ── Config commands ────────────────────────────────────────────

    pub async fn config_get(&self, key: &str) -> Result<Option<String>> {
        self.db
            .reader()
            .call({
                let key = key.to_string();
                move |conn| repository::get_config(conn, &key)
            })
            .await
            .map_err(|e| Error::Database(e.to_string()))
    }

    /// Set a config value. Target keys must hold a number.
    pub async fn config_set(&self, key: &str, value: &str) -> Result<()> {
        if key.starts_with("targets.") {
            if !TARGET_KEYS.contains(&key) {
                return Err(Error::Config(format!("unknown target: {key}")));
            }
            parse_target(key, value)?;
        }
        self.db
            .writer()
            .call({
                let key = key.to_string();
                let value = value.trim().to_string();
                move |conn| repository::set_config(conn, &key, &value)
            })
            .await
            .map_err(|e| Error::Database(e.to_string()))
    }

    pub async fn config_list(&self) -> Result<Vec<(String, String)>> {
        self.db
            .reader()
            .call(|conn| repository::list_config(conn))
            .await
            .map_err(|e| Error::Database(e.to_string()))
    }
}

fn parse_target(key: &str, value: &str) -> Result<f64> {
    match value.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(Error::Config(format!("{key} must be a number, got {value:?}"))),
    }
}
