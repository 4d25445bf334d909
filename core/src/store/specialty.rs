//! Specialty reads used to reconcile the drafted pool with what persisted.

use super::{SpecialtyRow, TrackerStore};
use crate::{
    error::GenResult,
    types::{EntityId, IdWindow, TopicId},
};
use rusqlite::params;
use std::collections::BTreeMap;

impl TrackerStore {
    /// Distinct specialists per catalog topic, zero for uncovered topics.
    pub fn specialist_counts(&self) -> GenResult<BTreeMap<TopicId, usize>> {
        let mut stmt = self.conn.prepare(
            "SELECT t.topic_id, COUNT(s.engineer_id)
             FROM topic t
             LEFT JOIN engineer_specialty s ON s.topic_id = t.topic_id
             GROUP BY t.topic_id
             ORDER BY t.topic_id",
        )?;
        let rows = stmt.query_map([], |r| {
            Ok((r.get::<_, TopicId>(0)?, r.get::<_, i64>(1)? as usize))
        })?;
        rows.collect::<Result<BTreeMap<_, _>, _>>().map_err(Into::into)
    }

    /// Persisted specialty links of engineers whose id falls in `window`.
    pub fn specialty_links_in(&self, window: IdWindow) -> GenResult<Vec<SpecialtyRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT topic_id, engineer_id FROM engineer_specialty
             WHERE engineer_id BETWEEN ?1 AND ?2
             ORDER BY engineer_id, topic_id",
        )?;
        let rows = stmt.query_map(params![window.start, window.last()], |r| {
            Ok(SpecialtyRow {
                topic_id: r.get(0)?,
                engineer_id: r.get(1)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Every persisted specialist, grouped by topic, ids ascending.
    /// Topics without specialists map to an empty list.
    pub fn specialists_by_topic(&self) -> GenResult<BTreeMap<TopicId, Vec<EntityId>>> {
        let mut pool: BTreeMap<TopicId, Vec<EntityId>> = BTreeMap::new();
        let mut topics = self.conn.prepare("SELECT topic_id FROM topic ORDER BY topic_id")?;
        for topic in topics.query_map([], |r| r.get::<_, TopicId>(0))? {
            pool.insert(topic?, Vec::new());
        }

        let mut stmt = self.conn.prepare(
            "SELECT topic_id, engineer_id FROM engineer_specialty
             ORDER BY topic_id, engineer_id",
        )?;
        let rows = stmt.query_map([], |r| Ok((r.get::<_, TopicId>(0)?, r.get::<_, EntityId>(1)?)))?;
        for row in rows {
            let (topic, engineer) = row?;
            pool.entry(topic).or_default().push(engineer);
        }
        Ok(pool)
    }

    /// Largest number of specialties held by any single engineer.
    pub fn max_specialties_held(&self) -> GenResult<i64> {
        Ok(self.conn.query_row(
            "SELECT COALESCE(MAX(n), 0) FROM (
                 SELECT COUNT(*) AS n FROM engineer_specialty GROUP BY engineer_id
             )",
            [],
            |r| r.get(0),
        )?)
    }
}
