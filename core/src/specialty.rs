//! Specialty pool construction.
//!
//! PIPELINE (one call to `build`):
//!   1. Reconcile: seed the per-engineer ledger with links already persisted.
//!   2. Draft: each engineer draws 1..=max distinct topics; a link is admitted
//!      only if it is new and the engineer still has room.
//!   3. Persist the draft, then re-read per-topic counts from the store.
//!      The draft is never trusted as the persisted state.
//!   4. Repair: every topic below the minimum takes the missing specialists
//!      from the exact set of eligible engineers. Too few eligible engineers
//!      is fatal.
//!   5. Re-read the pool the allocator will use.
//!
//! Every draw in step 2 happens whether or not the link is admitted, so a
//! replay with the same seed walks the same stream.

use crate::{
    error::{GenError, GenResult},
    ledger::CapacityLedger,
    rng::PhaseRng,
    store::{tables, SpecialtyRow, TrackerStore},
    types::{EntityId, IdWindow, Persisted, Requested, TopicId},
};
use std::collections::{BTreeMap, HashSet};

/// Eligible engineers per topic, ids ascending.
#[derive(Debug, Clone, Default)]
pub struct SpecialtyPool {
    by_topic: BTreeMap<TopicId, Vec<EntityId>>,
}

impl SpecialtyPool {
    pub fn new(by_topic: BTreeMap<TopicId, Vec<EntityId>>) -> Self {
        Self { by_topic }
    }

    pub fn specialists(&self, topic: TopicId) -> &[EntityId] {
        self.by_topic.get(&topic).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn holds(&self, engineer: EntityId, topic: TopicId) -> bool {
        self.specialists(topic).binary_search(&engineer).is_ok()
    }
}

/// What the builder produced: the pool plus requested/persisted counts.
#[derive(Debug, Clone)]
pub struct SpecialtyOutcome {
    pub pool: SpecialtyPool,
    pub drafted: Requested,
    pub drafted_persisted: Persisted,
    pub repaired: Requested,
    pub repaired_persisted: Persisted,
}

pub struct SpecialtyPoolBuilder<'a> {
    store: &'a TrackerStore,
    min_per_topic: u32,
    held: CapacityLedger<EntityId>,
    links: HashSet<SpecialtyRow>,
}

impl<'a> SpecialtyPoolBuilder<'a> {
    pub fn new(store: &'a TrackerStore, max_per_engineer: u32, min_per_topic: u32) -> Self {
        Self {
            store,
            min_per_topic,
            held: CapacityLedger::new(max_per_engineer),
            links: HashSet::new(),
        }
    }

    /// Seed the ledger with links the store already holds for `engineers`.
    /// Returns the number of links found.
    pub fn reconcile_existing(&mut self, engineers: &[EntityId], window: IdWindow) -> GenResult<usize> {
        let ours: HashSet<EntityId> = engineers.iter().copied().collect();
        let mut found = 0;
        for link in self.store.specialty_links_in(window)? {
            if ours.contains(&link.engineer_id) && self.links.insert(link) {
                self.held.consume(link.engineer_id);
                found += 1;
            }
        }
        Ok(found)
    }

    /// Draw each engineer's specialties. Returns only the admitted links.
    pub fn draft(
        &mut self,
        engineers: &[EntityId],
        topics: &[TopicId],
        rng: &mut PhaseRng,
    ) -> Vec<SpecialtyRow> {
        let mut rows = Vec::new();
        if topics.is_empty() {
            return rows;
        }
        let max_k = (self.held.capacity() as usize).min(topics.len()).max(1) as u64;
        for &engineer in engineers {
            let k = rng.range_inclusive(1, max_k) as usize;
            for topic_id in rng.sample_distinct(topics, k) {
                let link = SpecialtyRow { topic_id, engineer_id: engineer };
                if self.links.contains(&link) || !self.held.has_room(&engineer) {
                    continue;
                }
                self.admit(link);
                rows.push(link);
            }
        }
        rows
    }

    /// Top up every topic below the minimum from the eligible engineers.
    /// `counts` must be the persisted per-topic specialist counts.
    pub fn repair(
        &mut self,
        engineers: &[EntityId],
        topics: &[TopicId],
        counts: &BTreeMap<TopicId, usize>,
        rng: &mut PhaseRng,
    ) -> GenResult<Vec<SpecialtyRow>> {
        let required = self.min_per_topic as usize;
        let mut rows = Vec::new();
        for &topic in topics {
            let have = counts.get(&topic).copied().unwrap_or(0);
            if have >= required {
                continue;
            }
            let need = required - have;
            let eligible: Vec<EntityId> = engineers
                .iter()
                .copied()
                .filter(|e| {
                    self.held.has_room(e)
                        && !self.links.contains(&SpecialtyRow { topic_id: topic, engineer_id: *e })
                })
                .collect();
            if eligible.len() < need {
                return Err(GenError::InsufficientSpecialists {
                    topic,
                    available: have + eligible.len(),
                    required,
                });
            }
            for engineer in rng.sample_distinct(&eligible, need) {
                let link = SpecialtyRow { topic_id: topic, engineer_id: engineer };
                self.admit(link);
                rows.push(link);
            }
            log::debug!("specialties: topic {topic} repaired {have} -> {required}");
        }
        Ok(rows)
    }

    /// Run the whole pipeline against the store.
    pub fn build(
        mut self,
        engineers: &[EntityId],
        topics: &[TopicId],
        window: IdWindow,
        rng: &mut PhaseRng,
    ) -> GenResult<SpecialtyOutcome> {
        let existing = self.reconcile_existing(engineers, window)?;

        let draft = self.draft(engineers, topics, rng);
        let drafted_persisted = self
            .store
            .batch_upsert(&tables::ENGINEER_SPECIALTY, &draft)?;

        let counts = self.store.specialist_counts()?;
        let repairs = self.repair(engineers, topics, &counts, rng)?;
        let repaired_persisted = self
            .store
            .batch_upsert(&tables::ENGINEER_SPECIALTY, &repairs)?;

        let pool = SpecialtyPool::new(self.store.specialists_by_topic()?);
        for &topic in topics {
            let available = pool.specialists(topic).len();
            if available < self.min_per_topic as usize {
                return Err(GenError::InsufficientSpecialists {
                    topic,
                    available,
                    required: self.min_per_topic as usize,
                });
            }
        }

        log::info!(
            "specialties: {existing} existing, {} drafted, {} repaired",
            draft.len(),
            repairs.len()
        );
        Ok(SpecialtyOutcome {
            pool,
            drafted: Requested(draft.len()),
            drafted_persisted,
            repaired: Requested(repairs.len()),
            repaired_persisted,
        })
    }

    fn admit(&mut self, link: SpecialtyRow) {
        self.links.insert(link);
        self.held.consume(link.engineer_id);
    }
}
