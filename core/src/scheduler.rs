//! Rate-limited submission scheduling.
//!
//! Every request gets a (submitter, date) slot before any of its other
//! attributes are drawn. A slot is only handed out while its
//! submitter-day bucket is below the daily cap.
//!
//! Sampling is bounded: `MAX_SLOT_ATTEMPTS` uniform draws, then an exact
//! scan of the under-quota buckets. An empty scan means the configured
//! capacity is exhausted, which is an error rather than a hang.

use crate::{
    config::{DailyCapScope, DateRange},
    error::{GenError, GenResult},
    ledger::CapacityLedger,
    rng::PhaseRng,
    store::TrackerStore,
    types::{EntityId, RequestKind},
};
use chrono::NaiveDate;

pub const MAX_SLOT_ATTEMPTS: u32 = 64;

/// Ledger key. `kind` is `None` when the cap is shared between kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotKey {
    pub submitter: EntityId,
    pub date: NaiveDate,
    pub kind: Option<RequestKind>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmissionSlot {
    pub submitter: EntityId,
    pub date: NaiveDate,
}

pub struct SubmissionScheduler {
    ledger: CapacityLedger<SlotKey>,
    scope: DailyCapScope,
    dates: DateRange,
    exhaustive_scans: usize,
}

impl SubmissionScheduler {
    pub fn new(daily_cap: u32, scope: DailyCapScope, dates: DateRange) -> Self {
        Self {
            ledger: CapacityLedger::new(daily_cap),
            scope,
            dates,
            exhaustive_scans: 0,
        }
    }

    fn key(&self, submitter: EntityId, date: NaiveDate, kind: RequestKind) -> SlotKey {
        SlotKey {
            submitter,
            date,
            kind: match self.scope {
                DailyCapScope::Shared => None,
                DailyCapScope::PerKind => Some(kind),
            },
        }
    }

    /// Count every persisted submission against its daily bucket. Requests
    /// already in the store are never regenerated, so all of them hold
    /// capacity.
    pub fn reconcile(&mut self, store: &TrackerStore) -> GenResult<usize> {
        let mut buckets = 0;
        for kind in [RequestKind::Feature, RequestKind::Bug] {
            for (submitter, date, count) in store.submission_counts(kind)? {
                let key = self.key(submitter, date, kind);
                self.ledger.seed(key, count);
                buckets += 1;
            }
        }
        Ok(buckets)
    }

    /// Pick a (submitter, date) whose bucket has room and consume one unit.
    pub fn assign_submission_slot(
        &mut self,
        submitters: &[EntityId],
        kind: RequestKind,
        rng: &mut PhaseRng,
    ) -> GenResult<SubmissionSlot> {
        let days = self.dates.days();
        if submitters.is_empty() || days == 0 {
            return Err(GenError::config("no submitters or no dates to schedule against"));
        }

        for _ in 0..MAX_SLOT_ATTEMPTS {
            let submitter = *rng.pick(submitters);
            let date = self.dates.nth_day(rng.next_u64_below(days as u64) as u32);
            let key = self.key(submitter, date, kind);
            if self.ledger.has_room(&key) {
                self.ledger.consume(key);
                return Ok(SubmissionSlot { submitter, date });
            }
        }

        // Rejection sampling kept hitting full buckets: scan exactly.
        self.exhaustive_scans += 1;
        let mut open = Vec::new();
        for &submitter in submitters {
            for day in 0..days {
                let date = self.dates.nth_day(day);
                if self.ledger.has_room(&self.key(submitter, date, kind)) {
                    open.push(SubmissionSlot { submitter, date });
                }
            }
        }
        if open.is_empty() {
            return Err(GenError::CapacityExhausted {
                kind: kind.name(),
                cap: self.ledger.capacity(),
            });
        }
        let slot = *rng.pick(&open);
        let key = self.key(slot.submitter, slot.date, kind);
        self.ledger.consume(key);
        log::debug!("scheduler: {} slot found by exhaustive scan", kind.name());
        Ok(slot)
    }

    /// Units consumed in one bucket.
    pub fn used(&self, submitter: EntityId, date: NaiveDate, kind: RequestKind) -> u32 {
        self.ledger.peek(&self.key(submitter, date, kind))
    }

    /// Number of times sampling fell through to the exact scan.
    pub fn exhaustive_scans(&self) -> usize {
        self.exhaustive_scans
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::{PhaseSlot, RngBank};

    fn one_day() -> DateRange {
        let d = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        DateRange { start: d, end: d }
    }

    #[test]
    fn fills_every_bucket_then_errors() {
        let mut sched = SubmissionScheduler::new(3, DailyCapScope::PerKind, one_day());
        let mut rng = RngBank::new(11).for_phase(PhaseSlot::Features);
        let users = [1, 2];
        for _ in 0..6 {
            sched
                .assign_submission_slot(&users, RequestKind::Feature, &mut rng)
                .unwrap();
        }
        let day = one_day().start;
        assert_eq!(sched.used(1, day, RequestKind::Feature), 3);
        assert_eq!(sched.used(2, day, RequestKind::Feature), 3);

        let err = sched
            .assign_submission_slot(&users, RequestKind::Feature, &mut rng)
            .unwrap_err();
        assert!(matches!(err, GenError::CapacityExhausted { cap: 3, .. }), "{err}");
        assert!(sched.exhaustive_scans() >= 1);
    }

    #[test]
    fn per_kind_buckets_are_independent() {
        let mut sched = SubmissionScheduler::new(1, DailyCapScope::PerKind, one_day());
        let mut rng = RngBank::new(11).for_phase(PhaseSlot::Bugs);
        sched.assign_submission_slot(&[9], RequestKind::Feature, &mut rng).unwrap();
        sched.assign_submission_slot(&[9], RequestKind::Bug, &mut rng).unwrap();
    }

    #[test]
    fn shared_bucket_spans_kinds() {
        let mut sched = SubmissionScheduler::new(1, DailyCapScope::Shared, one_day());
        let mut rng = RngBank::new(11).for_phase(PhaseSlot::Bugs);
        sched.assign_submission_slot(&[9], RequestKind::Feature, &mut rng).unwrap();
        let err = sched
            .assign_submission_slot(&[9], RequestKind::Bug, &mut rng)
            .unwrap_err();
        assert!(matches!(err, GenError::CapacityExhausted { .. }));
    }

    #[test]
    fn exhaustive_scan_finds_the_last_open_bucket() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let dates = DateRange { start, end: start + chrono::Duration::days(9) };
        let mut sched = SubmissionScheduler::new(1, DailyCapScope::PerKind, dates);
        let users: Vec<EntityId> = (1..=20).collect();
        let mut rng = RngBank::new(4).for_phase(PhaseSlot::Features);
        // 200 buckets of one unit each: every one must be handed out exactly once.
        let mut seen = std::collections::HashSet::new();
        for _ in 0..200 {
            let slot = sched
                .assign_submission_slot(&users, RequestKind::Feature, &mut rng)
                .unwrap();
            assert!(seen.insert((slot.submitter, slot.date)), "bucket reused");
        }
        assert!(sched
            .assign_submission_slot(&users, RequestKind::Feature, &mut rng)
            .is_err());
    }
}
