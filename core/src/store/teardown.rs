//! Deletes. Children always go before parents so foreign keys hold
//! at every statement.

use super::{tables, TrackerStore};
use crate::{error::GenResult, teardown::TeardownScope};
use rusqlite::params;

impl TrackerStore {
    /// Delete every row of every table. Returns rows deleted per table.
    pub fn delete_all(&self) -> GenResult<Vec<(&'static str, usize)>> {
        let mut deleted = Vec::with_capacity(tables::ALL.len());
        for table in tables::ALL.iter().rev() {
            let n = self.conn.execute(&format!("DELETE FROM {}", table.name), [])?;
            deleted.push((table.name, n));
        }
        Ok(deleted)
    }

    /// Delete rows inside the scope's identifier windows, plus every row
    /// that depends on them. Topics are catalog data and stay.
    pub fn delete_windows(&self, scope: &TeardownScope) -> GenResult<Vec<(&'static str, usize)>> {
        let (u0, u1) = (scope.users.start, scope.users.last());
        let (e0, e1) = (scope.engineers.start, scope.engineers.last());
        let (f0, f1) = (scope.features.start, scope.features.last());
        let (b0, b1) = (scope.bugs.start, scope.bugs.last());

        let mut deleted = Vec::with_capacity(8);

        let n = self.conn.execute(
            "DELETE FROM bug_assignment
             WHERE bug_id BETWEEN ?1 AND ?2
                OR engineer_id BETWEEN ?3 AND ?4
                OR bug_id IN (SELECT bug_id FROM bug WHERE submitter_id BETWEEN ?5 AND ?6)",
            params![b0, b1, e0, e1, u0, u1],
        )?;
        deleted.push((tables::BUG_ASSIGNMENT.name, n));

        let n = self.conn.execute(
            "DELETE FROM feature_assignment
             WHERE feature_id BETWEEN ?1 AND ?2
                OR engineer_id BETWEEN ?3 AND ?4
                OR feature_id IN (SELECT feature_id FROM feature WHERE submitter_id BETWEEN ?5 AND ?6)",
            params![f0, f1, e0, e1, u0, u1],
        )?;
        deleted.push((tables::FEATURE_ASSIGNMENT.name, n));

        let n = self.conn.execute(
            "DELETE FROM bug WHERE bug_id BETWEEN ?1 AND ?2 OR submitter_id BETWEEN ?3 AND ?4",
            params![b0, b1, u0, u1],
        )?;
        deleted.push((tables::BUG.name, n));

        let n = self.conn.execute(
            "DELETE FROM acceptance_criterion
             WHERE feature_id BETWEEN ?1 AND ?2
                OR feature_id IN (SELECT feature_id FROM feature WHERE submitter_id BETWEEN ?3 AND ?4)",
            params![f0, f1, u0, u1],
        )?;
        deleted.push((tables::ACCEPTANCE_CRITERION.name, n));

        let n = self.conn.execute(
            "DELETE FROM feature WHERE feature_id BETWEEN ?1 AND ?2 OR submitter_id BETWEEN ?3 AND ?4",
            params![f0, f1, u0, u1],
        )?;
        deleted.push((tables::FEATURE.name, n));

        let n = self.conn.execute(
            "DELETE FROM engineer_specialty WHERE engineer_id BETWEEN ?1 AND ?2",
            params![e0, e1],
        )?;
        deleted.push((tables::ENGINEER_SPECIALTY.name, n));

        let n = self.conn.execute(
            "DELETE FROM engineer WHERE engineer_id BETWEEN ?1 AND ?2",
            params![e0, e1],
        )?;
        deleted.push((tables::ENGINEER.name, n));

        let n = self.conn.execute(
            "DELETE FROM app_user WHERE user_id BETWEEN ?1 AND ?2",
            params![u0, u1],
        )?;
        deleted.push((tables::APP_USER.name, n));

        Ok(deleted)
    }
}
