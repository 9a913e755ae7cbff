use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::records::{ActivityLog, ActivityType, FinanceEntry, PipelineItem, PipelineStatus};

/// Which record stream a table holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Pipeline,
    Activity,
    Finance,
}

impl RecordKind {
    pub fn table(&self) -> &'static str {
        match self {
            RecordKind::Pipeline => "pipeline_items",
            RecordKind::Activity => "activity_logs",
            RecordKind::Finance => "finance_entries",
        }
    }
}

fn format_ts(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn parse_ts(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

// ── Pipeline items ─────────────────────────────────────────────────

/// Insert pipeline items in one transaction. With `replace`, the existing
/// rows are deleted inside the same transaction first.
pub fn insert_pipeline_items(
    conn: &mut Connection,
    items: &[PipelineItem],
    replace: bool,
) -> Result<usize, rusqlite::Error> {
    let tx = conn.transaction()?;
    if replace {
        clear_before_import(&tx, RecordKind::Pipeline)?;
    }
    {
        let mut stmt = tx.prepare(
            "INSERT INTO pipeline_items (item_id, status, bdr, category, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )?;
        for item in items {
            stmt.execute(params![
                item.id,
                item.status.as_str(),
                item.bdr,
                item.category,
                item.created_at.as_ref().map(format_ts),
            ])?;
        }
    }
    tx.commit()?;
    Ok(items.len())
}

/// All pipeline items, optionally limited to one BDR.
pub fn list_pipeline_items(
    conn: &Connection,
    bdr: Option<&str>,
) -> Result<Vec<PipelineItem>, rusqlite::Error> {
    let mut stmt = conn.prepare(
        "SELECT item_id, status, bdr, category, created_at FROM pipeline_items
         WHERE ?1 IS NULL OR bdr = ?1
         ORDER BY row_id",
    )?;
    let rows = stmt.query_map(params![bdr], |row| {
        let created_at: Option<String> = row.get(4)?;
        Ok(PipelineItem {
            id: row.get(0)?,
            status: PipelineStatus::from(row.get::<_, String>(1)?),
            bdr: row.get(2)?,
            category: row.get(3)?,
            created_at: created_at.as_deref().and_then(|s| {
                let parsed = parse_ts(s);
                if parsed.is_none() {
                    log::warn!("pipeline item has unparseable created_at {s:?}, ignoring date");
                }
                parsed
            }),
        })
    })?;
    rows.collect()
}

// ── Activity logs ──────────────────────────────────────────────────

pub fn insert_activity_logs(
    conn: &mut Connection,
    logs: &[ActivityLog],
    replace: bool,
) -> Result<usize, rusqlite::Error> {
    let tx = conn.transaction()?;
    if replace {
        clear_before_import(&tx, RecordKind::Activity)?;
    }
    {
        let mut stmt = tx.prepare(
            "INSERT INTO activity_logs (activity_type, timestamp, bdr) VALUES (?1, ?2, ?3)",
        )?;
        for log in logs {
            stmt.execute(params![
                log.activity_type.as_str(),
                format_ts(&log.timestamp),
                log.bdr
            ])?;
        }
    }
    tx.commit()?;
    Ok(logs.len())
}

/// All activity logs, optionally limited to one BDR. Rows whose timestamp
/// cannot be parsed are skipped with a warning.
pub fn list_activity_logs(
    conn: &Connection,
    bdr: Option<&str>,
) -> Result<Vec<ActivityLog>, rusqlite::Error> {
    let mut stmt = conn.prepare(
        "SELECT row_id, activity_type, timestamp, bdr FROM activity_logs
         WHERE ?1 IS NULL OR bdr = ?1
         ORDER BY timestamp, row_id",
    )?;
    let mut rows = stmt.query(params![bdr])?;

    let mut logs = Vec::new();
    while let Some(row) = rows.next()? {
        let row_id: i64 = row.get(0)?;
        let raw_ts: String = row.get(2)?;
        let Some(timestamp) = parse_ts(&raw_ts) else {
            log::warn!("skipping activity log {row_id}: unparseable timestamp {raw_ts:?}");
            continue;
        };
        logs.push(ActivityLog {
            activity_type: ActivityType::from(row.get::<_, String>(1)?),
            timestamp,
            bdr: row.get(3)?,
        });
    }
    Ok(logs)
}

// ── Finance entries ────────────────────────────────────────────────

pub fn insert_finance_entries(
    conn: &mut Connection,
    entries: &[FinanceEntry],
    replace: bool,
) -> Result<usize, rusqlite::Error> {
    let tx = conn.transaction()?;
    if replace {
        clear_before_import(&tx, RecordKind::Finance)?;
    }
    {
        let mut stmt = tx.prepare(
            "INSERT INTO finance_entries (bdr, gbp_amount, created_at, status, month)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )?;
        for entry in entries {
            stmt.execute(params![
                entry.bdr,
                entry.gbp_amount,
                format_ts(&entry.created_at),
                entry.status,
                entry.month,
            ])?;
        }
    }
    tx.commit()?;
    Ok(entries.len())
}

/// All finance entries, optionally limited to one BDR. Rows whose
/// created_at cannot be parsed are skipped with a warning.
pub fn list_finance_entries(
    conn: &Connection,
    bdr: Option<&str>,
) -> Result<Vec<FinanceEntry>, rusqlite::Error> {
    let mut stmt = conn.prepare(
        "SELECT row_id, bdr, gbp_amount, created_at, status, month FROM finance_entries
         WHERE ?1 IS NULL OR bdr = ?1
         ORDER BY created_at, row_id",
    )?;
    let mut rows = stmt.query(params![bdr])?;

    let mut entries = Vec::new();
    while let Some(row) = rows.next()? {
        let row_id: i64 = row.get(0)?;
        let raw_ts: String = row.get(3)?;
        let Some(created_at) = parse_ts(&raw_ts) else {
            log::warn!("skipping finance entry {row_id}: unparseable created_at {raw_ts:?}");
            continue;
        };
        entries.push(FinanceEntry {
            bdr: row.get(1)?,
            gbp_amount: row.get(2)?,
            created_at,
            status: row.get(4)?,
            month: row.get(5)?,
        });
    }
    Ok(entries)
}

// ── Maintenance ────────────────────────────────────────────────────

/// Delete every row of one record stream. Returns the number removed.
pub fn clear_records(conn: &Connection, kind: RecordKind) -> Result<usize, rusqlite::Error> {
    conn.execute(&format!("DELETE FROM {}", kind.table()), [])
}

fn clear_before_import(conn: &Connection, kind: RecordKind) -> Result<(), rusqlite::Error> {
    let removed = clear_records(conn, kind)?;
    log::info!("replacing {removed} rows in {}", kind.table());
    Ok(())
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct RecordCounts {
    pub pipeline_items: i64,
    pub activity_logs: i64,
    pub finance_entries: i64,
}

pub fn record_counts(conn: &Connection) -> Result<RecordCounts, rusqlite::Error> {
    let count = |kind: RecordKind| -> Result<i64, rusqlite::Error> {
        let sql = format!("SELECT COUNT(*) FROM {}", kind.table());
        conn.query_row(&sql, [], |row| row.get(0))
    };
    Ok(RecordCounts {
        pipeline_items: count(RecordKind::Pipeline)?,
        activity_logs: count(RecordKind::Activity)?,
        finance_entries: count(RecordKind::Finance)?,
    })
}

// ── Config ─────────────────────────────────────────────────────────

pub fn get_config(conn: &Connection, key: &str) -> Result<Option<String>, rusqlite::Error> {
    conn.query_row(
        "SELECT value FROM app_config WHERE key = ?1",
        params![key],
        |row| row.get(0),
    )
    .optional()
}

pub fn set_config(conn: &Connection, key: &str, value: &str) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT OR REPLACE INTO app_config (key, value, updated_at)
         VALUES (?1, ?2, datetime('now'))",
        params![key, value],
    )?;
    Ok(())
}

pub fn list_config(conn: &Connection) -> Result<Vec<(String, String)>, rusqlite::Error> {
    let mut stmt = conn.prepare("SELECT key, value FROM app_config ORDER BY key")?;
    let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
    rows.collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Database;
    use chrono::TimeZone;

    fn ts(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, d, 9, 30, 0).unwrap()
    }

    #[tokio::test]
    async fn test_finance_round_trip_keeps_null_amount() {
        let db = Database::open_memory().await.unwrap();
        let entries = vec![
            FinanceEntry {
                bdr: "A".into(),
                gbp_amount: Some(1250.5),
                created_at: ts(2),
                status: "Paid".into(),
                month: "October".into(),
            },
            FinanceEntry {
                bdr: "B".into(),
                gbp_amount: None,
                created_at: ts(1),
                status: "Invoiced".into(),
                month: "October".into(),
            },
        ];

        let loaded = db
            .writer()
            .call(move |conn| {
                insert_finance_entries(conn, &entries, false)?;
                list_finance_entries(conn, None)
            })
            .await
            .unwrap();

        assert_eq!(loaded.len(), 2);
        // Ordered by created_at
        assert_eq!(loaded[0].bdr, "B");
        assert_eq!(loaded[0].gbp_amount, None);
        assert_eq!(loaded[1].gbp_amount, Some(1250.5));
        assert_eq!(loaded[1].created_at, ts(2));
    }

    #[tokio::test]
    async fn test_bdr_filter() {
        let db = Database::open_memory().await.unwrap();
        let logs = vec![
            ActivityLog {
                activity_type: ActivityType::CallCompleted,
                timestamp: ts(1),
                bdr: "A".into(),
            },
            ActivityLog {
                activity_type: ActivityType::Unknown("Site_Visit".into()),
                timestamp: ts(2),
                bdr: "B".into(),
            },
        ];

        let (all, only_b) = db
            .writer()
            .call(move |conn| {
                insert_activity_logs(conn, &logs, false)?;
                Ok::<_, rusqlite::Error>((
                    list_activity_logs(conn, None)?,
                    list_activity_logs(conn, Some("B"))?,
                ))
            })
            .await
            .unwrap();

        assert_eq!(all.len(), 2);
        assert_eq!(only_b.len(), 1);
        assert_eq!(
            only_b[0].activity_type,
            ActivityType::Unknown("Site_Visit".into())
        );
    }

    #[tokio::test]
    async fn test_malformed_timestamps_skipped() {
        let db = Database::open_memory().await.unwrap();

        let (logs, entries) = db
            .writer()
            .call(|conn| {
                conn.execute(
                    "INSERT INTO activity_logs (activity_type, timestamp, bdr)
                     VALUES ('Call_Completed', 'not a date', 'A'),
                            ('Call_Completed', '2026-10-16T09:00:00Z', 'A')",
                    [],
                )?;
                conn.execute(
                    "INSERT INTO finance_entries (bdr, gbp_amount, created_at)
                     VALUES ('A', 10.0, '16/10/2026')",
                    [],
                )?;
                Ok::<_, rusqlite::Error>((
                    list_activity_logs(conn, None)?,
                    list_finance_entries(conn, None)?,
                ))
            })
            .await
            .unwrap();

        assert_eq!(logs.len(), 1);
        assert!(entries.is_empty());
    }

    #[tokio::test]
    async fn test_pipeline_items_and_counts() {
        let db = Database::open_memory().await.unwrap();
        let items = vec![
            PipelineItem {
                id: Some("deal-1".into()),
                status: PipelineStatus::ListOut,
                bdr: "A".into(),
                category: "Events".into(),
                created_at: Some(ts(3)),
            },
            PipelineItem {
                id: None,
                status: PipelineStatus::Other("Paused".into()),
                bdr: "B".into(),
                category: String::new(),
                created_at: None,
            },
        ];

        let (loaded, counts, cleared, after) = db
            .writer()
            .call(move |conn| {
                insert_pipeline_items(conn, &items, false)?;
                let loaded = list_pipeline_items(conn, None)?;
                let counts = record_counts(conn)?;
                let cleared = clear_records(conn, RecordKind::Pipeline)?;
                let after = record_counts(conn)?;
                Ok::<_, rusqlite::Error>((loaded, counts, cleared, after))
            })
            .await
            .unwrap();

        assert_eq!(loaded[0].status, PipelineStatus::ListOut);
        assert_eq!(loaded[0].created_at, Some(ts(3)));
        assert_eq!(loaded[1].status, PipelineStatus::Other("Paused".into()));
        assert_eq!(counts.pipeline_items, 2);
        assert_eq!(counts.finance_entries, 0);
        assert_eq!(cleared, 2);
        assert_eq!(after.pipeline_items, 0);
    }

    fn entry(bdr: &str, amount: f64) -> FinanceEntry {
        FinanceEntry {
            bdr: bdr.into(),
            gbp_amount: Some(amount),
            created_at: ts(5),
            status: "Paid".into(),
            month: "October".into(),
        }
    }

    #[tokio::test]
    async fn test_replace_swaps_rows() {
        let db = Database::open_memory().await.unwrap();
        let loaded = db
            .writer()
            .call(|conn| {
                insert_finance_entries(conn, &[entry("A", 1.0), entry("A", 2.0)], false)?;
                insert_finance_entries(conn, &[entry("B", 3.0)], true)?;
                list_finance_entries(conn, None)
            })
            .await
            .unwrap();

        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].bdr, "B");
    }

    #[tokio::test]
    async fn test_failed_replace_keeps_existing_rows() {
        let db = Database::open_memory().await.unwrap();
        let (failed, counts) = db
            .writer()
            .call(|conn| {
                insert_finance_entries(conn, &[entry("A", 1.0), entry("A", 2.0)], false)?;
                conn.execute_batch(
                    "CREATE TEMP TRIGGER reject_bdr BEFORE INSERT ON finance_entries
                     WHEN NEW.bdr = 'rejected'
                     BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
                )?;
                let batch = [entry("B", 3.0), entry("rejected", 4.0)];
                let failed = insert_finance_entries(conn, &batch, true).is_err();
                Ok::<_, rusqlite::Error>((failed, record_counts(conn)?))
            })
            .await
            .unwrap();

        assert!(failed);
        assert_eq!(counts.finance_entries, 2);
    }

    #[tokio::test]
    async fn test_config() {
        let db = Database::open_memory().await.unwrap();
        let (missing, value, all) = db
            .writer()
            .call(|conn| {
                let missing = get_config(conn, "targets.lists_out")?;
                set_config(conn, "targets.lists_out", "3")?;
                set_config(conn, "targets.lists_out", "4")?;
                set_config(conn, "targets.agreement_rate", "2")?;
                Ok::<_, rusqlite::Error>((
                    missing,
                    get_config(conn, "targets.lists_out")?,
                    list_config(conn)?,
                ))
            })
            .await
            .unwrap();

        assert_eq!(missing, None);
        assert_eq!(value, Some("4".to_string()));
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].0, "targets.agreement_rate");
    }
}
