//! The generation run.
//!
//! PHASE ORDER (fixed, parents before children, never reordered):
//!   1. Topics
//!   2. Users
//!   3. Engineers
//!   4. Specialties   (draft, persist, reconcile, repair)
//!   5. Features      (submission slot first, then attributes)
//!   6. Acceptance criteria
//!   7. Bugs          (submission slot first, then attributes)
//!   8. Feature assignments
//!   9. Bug assignments
//!
//! RULES:
//!   - The whole run is one transaction. Any error rolls every phase back.
//!   - Each phase draws from its own RNG stream in the RngBank.
//!   - Ledgers live in the component that enforces them and die with the run.
//!   - Requested and persisted counts are reported separately.
//!   - Request ids the store already holds are never regenerated. Assignment
//!     reads requests back from the store and tops each one up to the fan-out
//!     on its stored topic.

use crate::{
    allocator::Allocator,
    attributes::AttributeGenerator,
    config::{GenConfig, PopulationConfig},
    error::{GenError, GenResult},
    rng::{PhaseRng, PhaseSlot, RngBank},
    scheduler::SubmissionScheduler,
    specialty::SpecialtyPoolBuilder,
    store::{
        tables, AssignmentRow, BugRow, CriterionRow, FeatureRow, PersonRow, StoredRequest, TopicRow,
        TrackerStore,
    },
    types::{EntityId, Persisted, RequestKind, Requested, TopicId},
};
use serde::Serialize;
use std::collections::HashSet;

const FEATURE_ENVIRONMENTS: &[&str] = &["production", "development", "testing"];
const FEATURE_STATUSES: &[&str] = &["open", "in_progress", "done"];
const BUG_STATUSES: &[&str] = &["open", "in_progress", "resolved", "closed"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EntityCount {
    pub requested: Requested,
    pub persisted: Persisted,
}

impl EntityCount {
    fn new(requested: usize, persisted: Persisted) -> Self {
        Self {
            requested: Requested(requested),
            persisted,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct GenerationReport {
    pub seed: u64,
    pub topics: EntityCount,
    pub users: EntityCount,
    pub engineers: EntityCount,
    pub specialties: EntityCount,
    pub specialty_repairs: EntityCount,
    pub features: EntityCount,
    pub acceptance_criteria: EntityCount,
    pub bugs: EntityCount,
    pub feature_assignments: EntityCount,
    pub bug_assignments: EntityCount,
    /// Allocations served by the relaxed (cap-ignoring) stage.
    pub fallback_allocations: usize,
}

impl GenerationReport {
    /// Per-entity counts in emission order, for printing.
    pub fn entities(&self) -> [(&'static str, EntityCount); 10] {
        [
            ("topics", self.topics),
            ("users", self.users),
            ("engineers", self.engineers),
            ("specialties", self.specialties),
            ("specialty repairs", self.specialty_repairs),
            ("features", self.features),
            ("acceptance criteria", self.acceptance_criteria),
            ("bugs", self.bugs),
            ("feature assignments", self.feature_assignments),
            ("bug assignments", self.bug_assignments),
        ]
    }
}

pub struct Generator<'a> {
    config: GenConfig,
    store: &'a TrackerStore,
    rng_bank: RngBank,
}

impl<'a> Generator<'a> {
    pub fn new(config: GenConfig, store: &'a TrackerStore) -> Self {
        let rng_bank = RngBank::new(config.seed);
        Self {
            config,
            store,
            rng_bank,
        }
    }

    /// Validate the configuration, then run every phase in one transaction.
    pub fn generate(&self) -> GenResult<GenerationReport> {
        self.config.validate()?;
        log::info!(
            "generate: seed={} users={} engineers={} features={} bugs={}",
            self.config.seed,
            self.config.users.count,
            self.config.engineers.count,
            self.config.features.count,
            self.config.bugs.count
        );
        self.store.with_transaction(|store| self.run(store))
    }

    fn run(&self, store: &TrackerStore) -> GenResult<GenerationReport> {
        let cfg = &self.config;
        let mut report = GenerationReport {
            seed: cfg.seed,
            ..Default::default()
        };

        // 1. Topics
        let topic_rows: Vec<TopicRow> = cfg
            .topics
            .iter()
            .enumerate()
            .map(|(i, name)| TopicRow {
                topic_id: i as TopicId + 1,
                name: name.clone(),
            })
            .collect();
        let topic_ids = cfg.topic_ids();
        report.topics = EntityCount::new(
            topic_rows.len(),
            store.batch_upsert(&tables::TOPIC, &topic_rows)?,
        );

        // 2–3. People
        let (user_rows, user_ids) =
            self.generate_people(&cfg.users, &mut self.rng_bank.for_phase(PhaseSlot::Users));
        report.users = EntityCount::new(
            user_rows.len(),
            store.batch_upsert(&tables::APP_USER, &user_rows)?,
        );
        let (engineer_rows, engineer_ids) = self.generate_people(
            &cfg.engineers,
            &mut self.rng_bank.for_phase(PhaseSlot::Engineers),
        );
        report.engineers = EntityCount::new(
            engineer_rows.len(),
            store.batch_upsert(&tables::ENGINEER, &engineer_rows)?,
        );
        log::info!(
            "people: {}/{} users, {}/{} engineers persisted",
            report.users.persisted.0,
            user_rows.len(),
            report.engineers.persisted.0,
            engineer_rows.len()
        );

        // 4. Specialties
        let has_requests = cfg.features.count + cfg.bugs.count > 0;
        let specialties = SpecialtyPoolBuilder::new(
            store,
            cfg.max_specialties_per_engineer,
            if has_requests { cfg.min_specialists_per_topic } else { 0 },
        )
        .build(
            &engineer_ids,
            &topic_ids,
            cfg.engineers.window,
            &mut self.rng_bank.for_phase(PhaseSlot::Specialties),
        )?;
        report.specialties = EntityCount {
            requested: specialties.drafted,
            persisted: specialties.drafted_persisted,
        };
        report.specialty_repairs = EntityCount {
            requested: specialties.repaired,
            persisted: specialties.repaired_persisted,
        };

        // 5–7. Requests
        let mut scheduler =
            SubmissionScheduler::new(cfg.daily_submission_cap, cfg.daily_cap_scope, cfg.dates);
        let seeded = scheduler.reconcile(store)?;
        log::debug!("scheduler: {seeded} existing submitter-day buckets");

        let stored_features = stored_ids(store, RequestKind::Feature, &cfg.features)?;
        let feature_rows = self.generate_features(
            &user_ids,
            &topic_ids,
            &stored_features,
            &mut scheduler,
            &mut self.rng_bank.for_phase(PhaseSlot::Features),
        )?;
        report.features = EntityCount::new(
            feature_rows.len(),
            store.batch_upsert(&tables::FEATURE, &feature_rows)?,
        );

        let criteria_rows = self.generate_criteria(
            store,
            &feature_rows,
            &mut self.rng_bank.for_phase(PhaseSlot::Criteria),
        )?;
        report.acceptance_criteria = EntityCount::new(
            criteria_rows.len(),
            store.batch_upsert(&tables::ACCEPTANCE_CRITERION, &criteria_rows)?,
        );

        let stored_bugs = stored_ids(store, RequestKind::Bug, &cfg.bugs)?;
        let bug_rows = self.generate_bugs(
            &user_ids,
            &topic_ids,
            &stored_bugs,
            &mut scheduler,
            &mut self.rng_bank.for_phase(PhaseSlot::Bugs),
        )?;
        report.bugs = EntityCount::new(bug_rows.len(), store.batch_upsert(&tables::BUG, &bug_rows)?);
        if scheduler.exhaustive_scans() > 0 {
            log::warn!(
                "scheduler: {} slots needed an exhaustive scan; daily capacity is tight",
                scheduler.exhaustive_scans()
            );
        }
        log::info!(
            "requests: {} features ({} already stored), {} criteria, {} bugs ({} already stored)",
            feature_rows.len(),
            stored_features.len(),
            criteria_rows.len(),
            bug_rows.len(),
            stored_bugs.len()
        );

        // 8–9. Assignments, against what the store now holds.
        let mut allocator = Allocator::new(specialties.pool, cfg.workload_cap);
        allocator.reconcile(store)?;
        let mut rng = self.rng_bank.for_phase(PhaseSlot::Allocation);
        let k = cfg.assignment_fanout as usize;

        let features = store.stored_requests(RequestKind::Feature, cfg.features.span())?;
        let feature_assignments = Self::assign(&mut allocator, &features, k, &mut rng)?;
        report.feature_assignments = EntityCount::new(
            feature_assignments.len(),
            store.batch_upsert(&tables::FEATURE_ASSIGNMENT, &feature_assignments)?,
        );
        let bugs = store.stored_requests(RequestKind::Bug, cfg.bugs.span())?;
        let bug_assignments = Self::assign(&mut allocator, &bugs, k, &mut rng)?;
        report.bug_assignments = EntityCount::new(
            bug_assignments.len(),
            store.batch_upsert(&tables::BUG_ASSIGNMENT, &bug_assignments)?,
        );

        report.fallback_allocations = allocator.fallbacks();
        if report.fallback_allocations > 0 {
            log::warn!(
                "allocator: {} of {} requests exceeded the workload cap of {}",
                report.fallback_allocations,
                features.len() + bugs.len(),
                cfg.workload_cap
            );
        }
        log::info!(
            "assignments: {} feature, {} bug",
            feature_assignments.len(),
            bug_assignments.len()
        );
        Ok(report)
    }

    /// Rows for every drawn identifier, plus the distinct ids in draw order.
    fn generate_people(
        &self,
        population: &PopulationConfig,
        rng: &mut PhaseRng,
    ) -> (Vec<PersonRow>, Vec<EntityId>) {
        let mut rows = Vec::with_capacity(population.count);
        let mut seen = HashSet::with_capacity(population.count);
        let mut ids = Vec::with_capacity(population.count);
        for _ in 0..population.count {
            let id = AttributeGenerator::generate_identifier(rng, population.window);
            let profile = AttributeGenerator::generate_profile(rng);
            if seen.insert(id) {
                ids.push(id);
            }
            rows.push(PersonRow {
                id,
                name: profile.name,
                email: profile.email,
            });
        }
        (rows, ids)
    }

    /// One row per id of the span the store does not hold yet.
    fn generate_features(
        &self,
        submitters: &[EntityId],
        topics: &[TopicId],
        stored: &HashSet<EntityId>,
        scheduler: &mut SubmissionScheduler,
        rng: &mut PhaseRng,
    ) -> GenResult<Vec<FeatureRow>> {
        let population = &self.config.features;
        let mut rows = Vec::with_capacity(population.count);
        for i in 0..population.count {
            let feature_id = population.window.nth(i);
            if stored.contains(&feature_id) {
                continue;
            }
            let slot = scheduler.assign_submission_slot(submitters, RequestKind::Feature, rng)?;
            rows.push(FeatureRow {
                feature_id,
                topic_id: *rng.pick(topics),
                title: AttributeGenerator::generate_title(rng, 4),
                environment: rng.pick(FEATURE_ENVIRONMENTS).to_string(),
                summary: AttributeGenerator::generate_text(rng, 3),
                status: rng.pick(FEATURE_STATUSES).to_string(),
                submitted_on: slot.date,
                submitter_id: slot.submitter,
            });
        }
        Ok(rows)
    }

    /// Criteria for the new features, numbered from the first free id of the
    /// criteria window.
    fn generate_criteria(
        &self,
        store: &TrackerStore,
        features: &[FeatureRow],
        rng: &mut PhaseRng,
    ) -> GenResult<Vec<CriterionRow>> {
        let window = self.config.criteria_window;
        let mut rows = Vec::new();
        if features.is_empty() {
            return Ok(rows);
        }
        let exhausted = || GenError::config(format!("criteria window {window:?} is used up"));
        let mut next = store
            .next_free_id(&tables::ACCEPTANCE_CRITERION, window)?
            .ok_or_else(exhausted)?;
        for feature in features {
            let k = rng.range_inclusive(1, self.config.max_criteria_per_feature as u64);
            for _ in 0..k {
                if !window.contains(next) {
                    return Err(exhausted());
                }
                rows.push(CriterionRow {
                    criterion_id: next,
                    description: AttributeGenerator::generate_sentence(rng, 6),
                    feature_id: feature.feature_id,
                });
                next += 1;
            }
        }
        Ok(rows)
    }

    fn generate_bugs(
        &self,
        submitters: &[EntityId],
        topics: &[TopicId],
        stored: &HashSet<EntityId>,
        scheduler: &mut SubmissionScheduler,
        rng: &mut PhaseRng,
    ) -> GenResult<Vec<BugRow>> {
        let population = &self.config.bugs;
        let mut rows = Vec::with_capacity(population.count);
        for i in 0..population.count {
            let bug_id = population.window.nth(i);
            if stored.contains(&bug_id) {
                continue;
            }
            let slot = scheduler.assign_submission_slot(submitters, RequestKind::Bug, rng)?;
            rows.push(BugRow {
                bug_id,
                topic_id: *rng.pick(topics),
                title: AttributeGenerator::generate_title(rng, 5),
                description: AttributeGenerator::generate_text(rng, 4),
                submitted_on: slot.date,
                status: rng.pick(BUG_STATUSES).to_string(),
                submitter_id: slot.submitter,
            });
        }
        Ok(rows)
    }

    /// Top every stored request up to `k` assignees on its stored topic.
    fn assign(
        allocator: &mut Allocator,
        requests: &[StoredRequest],
        k: usize,
        rng: &mut PhaseRng,
    ) -> GenResult<Vec<AssignmentRow>> {
        let mut rows = Vec::new();
        for request in requests {
            let allocation = allocator.top_up(request.topic_id, k, &request.assignees, rng)?;
            rows.extend(allocation.engineers.into_iter().map(|engineer_id| AssignmentRow {
                request_id: request.id,
                engineer_id,
            }));
        }
        Ok(rows)
    }
}

/// Ids of `population`'s span that the store already holds.
fn stored_ids(
    store: &TrackerStore,
    kind: RequestKind,
    population: &PopulationConfig,
) -> GenResult<HashSet<EntityId>> {
    Ok(store
        .stored_requests(kind, population.span())?
        .into_iter()
        .map(|r| r.id)
        .collect())
}

/// Populate `store` according to `config` in a single transaction.
pub fn generate(store: &TrackerStore, config: &GenConfig) -> GenResult<GenerationReport> {
    Generator::new(config.clone(), store).generate()
}
