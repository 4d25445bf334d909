//! SQLite persistence layer.
//!
//! RULE: Only the store talks to the database.
//! Generation phases call store methods and never execute SQL directly.
//!
//! Writes go through `batch_upsert`, which silently skips rows whose
//! conflict key already exists and reports how many rows actually landed.

use crate::{
    error::GenResult,
    types::{EntityId, IdWindow, Persisted},
};
use rusqlite::{params, params_from_iter, Connection, ToSql};
use std::collections::BTreeMap;

mod request;
mod rows;
mod specialty;
mod teardown;

pub use rows::{
    AssignmentRow, BugRow, CriterionRow, FeatureRow, PersonRow, SpecialtyRow, StoredRequest, TopicRow,
};

/// Limits enforced by the schema triggers in `001_tracker_schema.sql`.
pub mod limits {
    pub const MAX_SPECIALTIES_PER_ENGINEER: u32 = 2;
    pub const DAILY_SUBMISSION_CAP: u32 = 25;
    pub const ASSIGNMENT_FANOUT: u32 = 3;
}

/// A row that can be bound positionally against a `TableSpec`'s columns.
pub trait UpsertRow {
    fn values(&self) -> Vec<&dyn ToSql>;
}

/// Target table of a batched upsert.
#[derive(Debug, Clone, Copy)]
pub struct TableSpec {
    pub name: &'static str,
    pub columns: &'static [&'static str],
    pub conflict_key: &'static [&'static str],
}

pub mod tables {
    use super::TableSpec;

    pub const TOPIC: TableSpec = TableSpec {
        name: "topic",
        columns: &["topic_id", "name"],
        conflict_key: &["topic_id"],
    };
    pub const APP_USER: TableSpec = TableSpec {
        name: "app_user",
        columns: &["user_id", "name", "email"],
        conflict_key: &["user_id"],
    };
    pub const ENGINEER: TableSpec = TableSpec {
        name: "engineer",
        columns: &["engineer_id", "name", "email"],
        conflict_key: &["engineer_id"],
    };
    pub const ENGINEER_SPECIALTY: TableSpec = TableSpec {
        name: "engineer_specialty",
        columns: &["topic_id", "engineer_id"],
        conflict_key: &["topic_id", "engineer_id"],
    };
    pub const FEATURE: TableSpec = TableSpec {
        name: "feature",
        columns: &[
            "feature_id",
            "title",
            "environment",
            "summary",
            "status",
            "submitted_on",
            "topic_id",
            "submitter_id",
        ],
        conflict_key: &["feature_id"],
    };
    pub const ACCEPTANCE_CRITERION: TableSpec = TableSpec {
        name: "acceptance_criterion",
        columns: &["criterion_id", "description", "feature_id"],
        conflict_key: &["criterion_id"],
    };
    pub const BUG: TableSpec = TableSpec {
        name: "bug",
        columns: &[
            "bug_id",
            "title",
            "description",
            "submitted_on",
            "status",
            "topic_id",
            "submitter_id",
        ],
        conflict_key: &["bug_id"],
    };
    pub const FEATURE_ASSIGNMENT: TableSpec = TableSpec {
        name: "feature_assignment",
        columns: &["feature_id", "engineer_id"],
        conflict_key: &["feature_id", "engineer_id"],
    };
    pub const BUG_ASSIGNMENT: TableSpec = TableSpec {
        name: "bug_assignment",
        columns: &["bug_id", "engineer_id"],
        conflict_key: &["bug_id", "engineer_id"],
    };

    /// Every table, parents before children.
    pub const ALL: [TableSpec; 9] = [
        TOPIC,
        APP_USER,
        ENGINEER,
        ENGINEER_SPECIALTY,
        FEATURE,
        ACCEPTANCE_CRITERION,
        BUG,
        FEATURE_ASSIGNMENT,
        BUG_ASSIGNMENT,
    ];
}

pub struct TrackerStore {
    conn: Connection,
}

impl TrackerStore {
    pub fn open(path: &str) -> GenResult<Self> {
        let conn = Connection::open(path)?;
        // WAL mode only for real files (:memory: ignores it).
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> GenResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Create tables, indexes and integrity triggers. Safe to re-run.
    pub fn migrate(&self) -> GenResult<()> {
        self.conn
            .execute_batch(include_str!("../../../migrations/001_tracker_schema.sql"))?;
        Ok(())
    }

    // ── Transactions ──────────────────────────────────────────

    pub fn begin(&self) -> GenResult<()> {
        self.conn.execute_batch("BEGIN IMMEDIATE;")?;
        Ok(())
    }

    pub fn commit(&self) -> GenResult<()> {
        self.conn.execute_batch("COMMIT;")?;
        Ok(())
    }

    pub fn rollback(&self) -> GenResult<()> {
        self.conn.execute_batch("ROLLBACK;")?;
        Ok(())
    }

    /// Run `f` as one unit of work: commit on success, roll back on any error.
    pub fn with_transaction<T>(&self, f: impl FnOnce(&Self) -> GenResult<T>) -> GenResult<T> {
        self.begin()?;
        let outcome = f(self).and_then(|value| self.commit().map(|_| value));
        if let Err(e) = &outcome {
            if !self.conn.is_autocommit() {
                if let Err(rb) = self.rollback() {
                    log::error!("store: rollback failed after '{e}': {rb}");
                }
            }
            log::warn!("store: transaction rolled back: {e}");
        }
        outcome
    }

    // ── Batched writes ────────────────────────────────────────

    /// Insert `rows` into `table`, skipping any row whose conflict key
    /// already exists. Returns the number of rows that landed.
    pub fn batch_upsert<R: UpsertRow>(&self, table: &TableSpec, rows: &[R]) -> GenResult<Persisted> {
        if rows.is_empty() {
            return Ok(Persisted(0));
        }
        let placeholders = (1..=table.columns.len())
            .map(|i| format!("?{i}"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({}) ON CONFLICT ({}) DO NOTHING",
            table.name,
            table.columns.join(", "),
            placeholders,
            table.conflict_key.join(", "),
        );
        let mut stmt = self.conn.prepare_cached(&sql)?;
        let mut landed = 0usize;
        for row in rows {
            landed += stmt.execute(params_from_iter(row.values()))?;
        }
        log::debug!(
            "store: {} upserted {landed}/{} rows",
            table.name,
            rows.len()
        );
        Ok(Persisted(landed))
    }

    // ── Counts ────────────────────────────────────────────────

    pub fn row_count(&self, table: &TableSpec) -> GenResult<i64> {
        let count = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", table.name),
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// First identifier of `window` above every persisted key of `table`.
    /// `None` once the window is used up.
    pub fn next_free_id(&self, table: &TableSpec, window: IdWindow) -> GenResult<Option<EntityId>> {
        let key = table.conflict_key[0];
        let max: Option<EntityId> = self.conn.query_row(
            &format!("SELECT MAX({key}) FROM {} WHERE {key} BETWEEN ?1 AND ?2", table.name),
            params![window.start, window.last()],
            |row| row.get(0),
        )?;
        Ok(match max {
            None => Some(window.start),
            Some(id) if id < window.last() => Some(id + 1),
            Some(_) => None,
        })
    }

    /// Row count of every table, keyed by table name.
    pub fn row_counts(&self) -> GenResult<BTreeMap<&'static str, i64>> {
        let mut counts = BTreeMap::new();
        for table in tables::ALL {
            counts.insert(table.name, self.row_count(&table)?);
        }
        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GenError;

    fn store() -> TrackerStore {
        let store = TrackerStore::in_memory().unwrap();
        store.migrate().unwrap();
        store
    }

    fn topics() -> Vec<TopicRow> {
        vec![
            TopicRow { topic_id: 1, name: "Backend".into() },
            TopicRow { topic_id: 2, name: "Security".into() },
            TopicRow { topic_id: 3, name: "UI/UX".into() },
        ]
    }

    #[test]
    fn migrate_is_rerunnable() {
        let store = store();
        store.migrate().unwrap();
        assert_eq!(store.row_counts().unwrap().len(), 9);
    }

    #[test]
    fn upsert_skips_existing_keys() {
        let store = store();
        assert_eq!(store.batch_upsert(&tables::TOPIC, &topics()).unwrap(), Persisted(3));
        assert_eq!(store.batch_upsert(&tables::TOPIC, &topics()).unwrap(), Persisted(0));
        assert_eq!(store.row_count(&tables::TOPIC).unwrap(), 3);
    }

    #[test]
    fn specialty_trigger_blocks_third_link() {
        let store = store();
        store.batch_upsert(&tables::TOPIC, &topics()).unwrap();
        let eng = PersonRow { id: 7, name: "Ana Ruiz".into(), email: "ana.ruiz@example.cl".into() };
        store.batch_upsert(&tables::ENGINEER, &[eng]).unwrap();
        let links = [
            SpecialtyRow { topic_id: 1, engineer_id: 7 },
            SpecialtyRow { topic_id: 2, engineer_id: 7 },
        ];
        store.batch_upsert(&tables::ENGINEER_SPECIALTY, &links).unwrap();

        // Replaying an existing link is still a no-op.
        assert_eq!(
            store.batch_upsert(&tables::ENGINEER_SPECIALTY, &links[..1]).unwrap(),
            Persisted(0)
        );

        let third = [SpecialtyRow { topic_id: 3, engineer_id: 7 }];
        let err = store.batch_upsert(&tables::ENGINEER_SPECIALTY, &third).unwrap_err();
        assert!(matches!(err, GenError::Database(_)), "{err}");
    }

    #[test]
    fn next_free_id_skips_persisted_keys() {
        let store = store();
        let window = IdWindow::new(1, 3);
        assert_eq!(store.next_free_id(&tables::TOPIC, window).unwrap(), Some(1));
        store.batch_upsert(&tables::TOPIC, &topics()[..2]).unwrap();
        assert_eq!(store.next_free_id(&tables::TOPIC, window).unwrap(), Some(3));
        store.batch_upsert(&tables::TOPIC, &topics()).unwrap();
        assert_eq!(store.next_free_id(&tables::TOPIC, window).unwrap(), None);
    }

    #[test]
    fn dates_round_trip_through_the_store() {
        let store = store();
        store.batch_upsert(&tables::TOPIC, &topics()).unwrap();
        let user = PersonRow { id: 5, name: "Ana Ruiz".into(), email: "ana.ruiz@example.cl".into() };
        store.batch_upsert(&tables::APP_USER, &[user]).unwrap();
        let day = chrono::NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        let bug = BugRow {
            bug_id: 1,
            title: "Login falla".into(),
            description: "No carga.".into(),
            submitted_on: day,
            status: "open".into(),
            topic_id: 2,
            submitter_id: 5,
        };
        store.batch_upsert(&tables::BUG, &[bug]).unwrap();
        assert_eq!(
            store.submission_counts(crate::types::RequestKind::Bug).unwrap(),
            vec![(5, day, 1)]
        );
    }

    #[test]
    fn failed_transaction_leaves_no_rows() {
        let store = store();
        let result: GenResult<()> = store.with_transaction(|s| {
            s.batch_upsert(&tables::TOPIC, &topics())?;
            Err(GenError::config("forced failure"))
        });
        assert!(result.is_err());
        assert_eq!(store.row_count(&tables::TOPIC).unwrap(), 0);

        store
            .with_transaction(|s| s.batch_upsert(&tables::TOPIC, &topics()))
            .unwrap();
        assert_eq!(store.row_count(&tables::TOPIC).unwrap(), 3);
    }
}
