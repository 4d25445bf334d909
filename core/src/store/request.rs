//! Request and assignment reads: persisted submitter-day usage, engineer
//! workload and stored requests, plus the integrity checks used by tests
//! and the runner.

use super::{StoredRequest, TrackerStore};
use crate::{
    error::GenResult,
    types::{EntityId, IdWindow, RequestKind},
};
use chrono::NaiveDate;
use rusqlite::params;
use std::collections::{BTreeMap, HashMap};

/// (table, id column, assignment table, assignment id column)
fn request_tables(kind: RequestKind) -> (&'static str, &'static str, &'static str, &'static str) {
    match kind {
        RequestKind::Feature => ("feature", "feature_id", "feature_assignment", "feature_id"),
        RequestKind::Bug => ("bug", "bug_id", "bug_assignment", "bug_id"),
    }
}

impl TrackerStore {
    /// Submissions per (submitter, day) for every persisted request of `kind`.
    pub fn submission_counts(&self, kind: RequestKind) -> GenResult<Vec<(EntityId, NaiveDate, u32)>> {
        let (table, _, _, _) = request_tables(kind);
        let mut stmt = self.conn.prepare(&format!(
            "SELECT submitter_id, submitted_on, COUNT(*) FROM {table}
             GROUP BY submitter_id, submitted_on"
        ))?;
        let rows = stmt.query_map([], |r| {
            Ok((
                r.get::<_, EntityId>(0)?,
                r.get::<_, NaiveDate>(1)?,
                r.get::<_, i64>(2)? as u32,
            ))
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Total persisted assignments per engineer, features and bugs combined.
    pub fn workload(&self) -> GenResult<HashMap<EntityId, u32>> {
        let mut stmt = self.conn.prepare(
            "SELECT engineer_id, COUNT(*) FROM (
                 SELECT engineer_id FROM feature_assignment
                 UNION ALL
                 SELECT engineer_id FROM bug_assignment
             )
             GROUP BY engineer_id",
        )?;
        let rows = stmt.query_map([], |r| {
            Ok((r.get::<_, EntityId>(0)?, r.get::<_, i64>(1)? as u32))
        })?;
        rows.collect::<Result<HashMap<_, _>, _>>().map_err(Into::into)
    }

    /// Persisted requests of `kind` inside `span` with their stored topic and
    /// current assignees, ids ascending.
    pub fn stored_requests(&self, kind: RequestKind, span: IdWindow) -> GenResult<Vec<StoredRequest>> {
        let (table, id_col, assign_table, assign_col) = request_tables(kind);
        let mut requests: BTreeMap<EntityId, StoredRequest> = BTreeMap::new();

        let mut stmt = self.conn.prepare(&format!(
            "SELECT {id_col}, topic_id FROM {table} WHERE {id_col} BETWEEN ?1 AND ?2"
        ))?;
        let rows = stmt.query_map(params![span.start, span.last()], |r| {
            Ok(StoredRequest {
                id: r.get(0)?,
                topic_id: r.get(1)?,
                assignees: Vec::new(),
            })
        })?;
        for row in rows {
            let request = row?;
            requests.insert(request.id, request);
        }

        let mut stmt = self.conn.prepare(&format!(
            "SELECT {assign_col}, engineer_id FROM {assign_table}
             WHERE {assign_col} BETWEEN ?1 AND ?2
             ORDER BY {assign_col}, engineer_id"
        ))?;
        let rows = stmt.query_map(params![span.start, span.last()], |r| {
            Ok((r.get::<_, EntityId>(0)?, r.get::<_, EntityId>(1)?))
        })?;
        for row in rows {
            let (id, engineer) = row?;
            if let Some(request) = requests.get_mut(&id) {
                request.assignees.push(engineer);
            }
        }
        Ok(requests.into_values().collect())
    }

    /// Largest number of `kind` requests any submitter filed on one day.
    pub fn max_daily_submissions(&self, kind: RequestKind) -> GenResult<i64> {
        let (table, _, _, _) = request_tables(kind);
        Ok(self.conn.query_row(
            &format!(
                "SELECT COALESCE(MAX(n), 0) FROM (
                     SELECT COUNT(*) AS n FROM {table} GROUP BY submitter_id, submitted_on
                 )"
            ),
            [],
            |r| r.get(0),
        )?)
    }

    /// Largest number of requests of either kind any submitter filed on one day.
    pub fn max_daily_submissions_combined(&self) -> GenResult<i64> {
        Ok(self.conn.query_row(
            "SELECT COALESCE(MAX(n), 0) FROM (
                 SELECT COUNT(*) AS n FROM (
                     SELECT submitter_id, submitted_on FROM feature
                     UNION ALL
                     SELECT submitter_id, submitted_on FROM bug
                 )
                 GROUP BY submitter_id, submitted_on
             )",
            [],
            |r| r.get(0),
        )?)
    }

    /// Number of distinct assignees per request of `kind`, zero included.
    pub fn assignee_counts(&self, kind: RequestKind) -> GenResult<Vec<(EntityId, i64)>> {
        let (table, id_col, assign_table, assign_col) = request_tables(kind);
        let mut stmt = self.conn.prepare(&format!(
            "SELECT r.{id_col}, COUNT(a.engineer_id)
             FROM {table} r
             LEFT JOIN {assign_table} a ON a.{assign_col} = r.{id_col}
             GROUP BY r.{id_col}
             ORDER BY r.{id_col}"
        ))?;
        let rows = stmt.query_map([], |r| Ok((r.get::<_, EntityId>(0)?, r.get::<_, i64>(1)?)))?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Assignments whose engineer holds no specialty in the request's topic.
    pub fn mismatched_assignments(&self, kind: RequestKind) -> GenResult<i64> {
        let (table, id_col, assign_table, assign_col) = request_tables(kind);
        Ok(self.conn.query_row(
            &format!(
                "SELECT COUNT(*) FROM {assign_table} a
                 JOIN {table} r ON r.{id_col} = a.{assign_col}
                 WHERE NOT EXISTS (
                     SELECT 1 FROM engineer_specialty s
                     WHERE s.engineer_id = a.engineer_id AND s.topic_id = r.topic_id
                 )"
            ),
            [],
            |r| r.get(0),
        )?)
    }

    /// Assignees of one request, ids ascending.
    pub fn assignees_of(&self, kind: RequestKind, request_id: EntityId) -> GenResult<Vec<EntityId>> {
        let (_, _, assign_table, assign_col) = request_tables(kind);
        let mut stmt = self.conn.prepare(&format!(
            "SELECT engineer_id FROM {assign_table} WHERE {assign_col} = ?1 ORDER BY engineer_id"
        ))?;
        let rows = stmt.query_map(params![request_id], |r| r.get::<_, EntityId>(0))?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}
