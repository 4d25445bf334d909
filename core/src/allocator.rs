//! Pick-K assignment.
//!
//! Every request gets exactly K distinct engineers who hold a specialty in
//! its topic. Selection runs in two stages:
//!   Preferred: specialists below the workload cap.
//!   Fallback:  every specialist of the topic, cap ignored.
//! The first stage with at least K candidates wins. Only the soft workload
//! cap is ever relaxed; distinctness and topic match never are.
//!
//! A request that already has some assignees is topped up: they are kept,
//! excluded from the candidates, and only the missing ones are drawn.

use crate::{
    error::{GenError, GenResult},
    ledger::CapacityLedger,
    rng::PhaseRng,
    specialty::SpecialtyPool,
    store::TrackerStore,
    types::{EntityId, TopicId},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionStage {
    Preferred,
    Fallback,
}

impl SelectionStage {
    /// Stages in the order they are tried.
    pub const ORDER: [SelectionStage; 2] = [SelectionStage::Preferred, SelectionStage::Fallback];

    fn admits(self, workload: &CapacityLedger<EntityId>, engineer: &EntityId) -> bool {
        match self {
            Self::Preferred => workload.has_room(engineer),
            Self::Fallback => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Allocation {
    pub stage: SelectionStage,
    pub engineers: Vec<EntityId>,
}

pub struct Allocator {
    pool: SpecialtyPool,
    workload: CapacityLedger<EntityId>,
    fallbacks: usize,
}

impl Allocator {
    pub fn new(pool: SpecialtyPool, workload_cap: u32) -> Self {
        Self {
            pool,
            workload: CapacityLedger::new(workload_cap),
            fallbacks: 0,
        }
    }

    /// Count every persisted assignment against its engineer's workload.
    pub fn reconcile(&mut self, store: &TrackerStore) -> GenResult<usize> {
        let existing = store.workload()?;
        let engineers = existing.len();
        for (engineer, count) in existing {
            self.workload.seed(engineer, count);
        }
        Ok(engineers)
    }

    pub fn seed_workload(&mut self, engineer: EntityId, count: u32) {
        self.workload.seed(engineer, count);
    }

    /// The candidates `pick_k` would sample from, and the stage that produced
    /// them. Does not consume anything.
    pub fn candidate_pool(&self, topic: TopicId, k: usize) -> GenResult<(SelectionStage, Vec<EntityId>)> {
        self.candidates(topic, k, &[])
    }

    fn candidates(
        &self,
        topic: TopicId,
        k: usize,
        assigned: &[EntityId],
    ) -> GenResult<(SelectionStage, Vec<EntityId>)> {
        let specialists = self.pool.specialists(topic);
        for stage in SelectionStage::ORDER {
            let candidates: Vec<EntityId> = specialists
                .iter()
                .filter(|e| !assigned.contains(e) && stage.admits(&self.workload, e))
                .copied()
                .collect();
            if candidates.len() >= k {
                return Ok((stage, candidates));
            }
        }
        Err(GenError::InsufficientSpecialists {
            topic,
            available: specialists.iter().filter(|e| !assigned.contains(e)).count(),
            required: k,
        })
    }

    /// Choose exactly `k` distinct specialists of `topic` and charge each one
    /// unit of workload.
    pub fn pick_k(&mut self, topic: TopicId, k: usize, rng: &mut PhaseRng) -> GenResult<Allocation> {
        self.top_up(topic, k, &[], rng)
    }

    /// Bring a request holding `assigned` up to `k` assignees. Returns only
    /// the newly chosen engineers; a full request gets none.
    pub fn top_up(
        &mut self,
        topic: TopicId,
        k: usize,
        assigned: &[EntityId],
        rng: &mut PhaseRng,
    ) -> GenResult<Allocation> {
        let need = k.saturating_sub(assigned.len());
        if need == 0 {
            return Ok(Allocation {
                stage: SelectionStage::Preferred,
                engineers: Vec::new(),
            });
        }
        let (stage, candidates) = self.candidates(topic, need, assigned)?;
        let engineers = rng.sample_distinct(&candidates, need);
        for &engineer in &engineers {
            self.workload.consume(engineer);
        }
        if stage == SelectionStage::Fallback {
            self.fallbacks += 1;
            log::debug!("allocator: topic {topic} fell back to the full specialist pool");
        }
        Ok(Allocation { stage, engineers })
    }

    pub fn workload(&self, engineer: EntityId) -> u32 {
        self.workload.peek(&engineer)
    }

    /// Number of `pick_k` calls served by the fallback stage.
    pub fn fallbacks(&self) -> usize {
        self.fallbacks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::{PhaseSlot, RngBank};
    use std::collections::BTreeMap;

    fn pool() -> SpecialtyPool {
        SpecialtyPool::new(BTreeMap::from([
            (1, vec![10, 11, 12]),
            (2, vec![20, 21, 22, 23, 24, 25]),
            (3, vec![30, 31]),
        ]))
    }

    #[test]
    fn returns_k_distinct_topic_specialists() {
        let mut alloc = Allocator::new(pool(), 20);
        let mut rng = RngBank::new(1).for_phase(PhaseSlot::Allocation);
        for _ in 0..50 {
            let a = alloc.pick_k(2, 3, &mut rng).unwrap();
            let mut ids = a.engineers.clone();
            ids.sort_unstable();
            ids.dedup();
            assert_eq!(ids.len(), 3);
            assert!(ids.iter().all(|e| (20..=25).contains(e)));
        }
    }

    #[test]
    fn falls_back_when_preferred_pool_is_short() {
        let mut alloc = Allocator::new(pool(), 20);
        alloc.seed_workload(10, 20);
        alloc.seed_workload(11, 20);

        let (stage, candidates) = alloc.candidate_pool(1, 3).unwrap();
        assert_eq!(stage, SelectionStage::Fallback);
        assert_eq!(candidates, vec![10, 11, 12]);

        let mut rng = RngBank::new(1).for_phase(PhaseSlot::Allocation);
        let mut a = alloc.pick_k(1, 3, &mut rng).unwrap();
        a.engineers.sort_unstable();
        assert_eq!(a.engineers, vec![10, 11, 12]);
        assert_eq!(a.stage, SelectionStage::Fallback);
        assert_eq!(alloc.fallbacks(), 1);
        assert_eq!(alloc.workload(10), 21);
    }

    #[test]
    fn preferred_stage_skips_engineers_at_cap() {
        let mut alloc = Allocator::new(pool(), 5);
        alloc.seed_workload(20, 5);
        alloc.seed_workload(21, 5);
        let (stage, candidates) = alloc.candidate_pool(2, 3).unwrap();
        assert_eq!(stage, SelectionStage::Preferred);
        assert_eq!(candidates, vec![22, 23, 24, 25]);
    }

    #[test]
    fn top_up_keeps_existing_assignees_out_of_the_draw() {
        let mut alloc = Allocator::new(pool(), 20);
        let mut rng = RngBank::new(2).for_phase(PhaseSlot::Allocation);
        for _ in 0..20 {
            let a = alloc.top_up(1, 3, &[10], &mut rng).unwrap();
            let mut picked = a.engineers.clone();
            picked.sort_unstable();
            assert_eq!(picked, vec![11, 12]);
        }
        let full = alloc.top_up(1, 3, &[10, 11, 12], &mut rng).unwrap();
        assert!(full.engineers.is_empty());
        assert_eq!(alloc.workload(10), 0, "kept assignees are not charged again");
    }

    #[test]
    fn too_few_specialists_is_an_error() {
        let mut alloc = Allocator::new(pool(), 20);
        let mut rng = RngBank::new(1).for_phase(PhaseSlot::Allocation);
        let err = alloc.pick_k(3, 3, &mut rng).unwrap_err();
        assert!(matches!(
            err,
            GenError::InsufficientSpecialists { topic: 3, available: 2, required: 3 }
        ));
        assert_eq!(alloc.workload(30), 0, "failed pick must not consume");
    }
}
