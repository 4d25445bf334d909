use crate::{
    error::{GenError, GenResult},
    store::limits,
    types::IdWindow,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// How the daily submission cap is shared between request kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DailyCapScope {
    /// Features and bugs draw from one bucket per submitter-day.
    Shared,
    /// Features and bugs each have their own bucket per submitter-day.
    PerKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PopulationConfig {
    pub count: usize,
    pub window: IdWindow,
}

impl PopulationConfig {
    /// The dense ids a run emits: the first `count` ids of the window.
    pub fn span(&self) -> IdWindow {
        IdWindow::new(self.window.start, self.count as i64)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Number of calendar days in the range, both ends included.
    pub fn days(&self) -> u32 {
        ((self.end - self.start).num_days() + 1).max(0) as u32
    }

    pub fn nth_day(&self, n: u32) -> NaiveDate {
        self.start + chrono::Duration::days(n as i64)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenConfig {
    pub seed: u64,
    /// Topic catalog; topic ids are 1-based positions in this list.
    pub topics: Vec<String>,
    pub users: PopulationConfig,
    pub engineers: PopulationConfig,
    pub features: PopulationConfig,
    pub bugs: PopulationConfig,
    pub criteria_window: IdWindow,
    pub max_criteria_per_feature: u32,
    pub max_specialties_per_engineer: u32,
    pub min_specialists_per_topic: u32,
    pub daily_submission_cap: u32,
    pub daily_cap_scope: DailyCapScope,
    pub assignment_fanout: u32,
    /// Soft cap on total assignments per engineer, features and bugs combined.
    pub workload_cap: u32,
    pub dates: DateRange,
}

impl Default for GenConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            topics: vec!["Backend".into(), "Security".into(), "UI/UX".into()],
            users: PopulationConfig {
                count: 50,
                window: IdWindow::new(10_000_000, 10_000_000),
            },
            engineers: PopulationConfig {
                count: 80,
                window: IdWindow::new(20_000_000, 10_000_000),
            },
            features: PopulationConfig {
                count: 200,
                window: IdWindow::new(1, 100_000),
            },
            bugs: PopulationConfig {
                count: 300,
                window: IdWindow::new(1, 100_000),
            },
            criteria_window: IdWindow::new(1, 1_000_000),
            max_criteria_per_feature: 3,
            max_specialties_per_engineer: 2,
            min_specialists_per_topic: 3,
            daily_submission_cap: 25,
            daily_cap_scope: DailyCapScope::PerKind,
            assignment_fanout: 3,
            workload_cap: 20,
            dates: DateRange {
                start: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap_or_default(),
                end: NaiveDate::from_ymd_opt(2025, 12, 31).unwrap_or_default(),
            },
        }
    }
}

impl GenConfig {
    /// Load from a JSON file. Missing fields take production defaults.
    /// In tests, use GenConfig::default_test().
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: GenConfig = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {path}: {e}"))?;
        Ok(config)
    }

    /// Small population for unit and integration tests.
    pub fn default_test() -> Self {
        Self {
            users: PopulationConfig {
                count: 20,
                window: IdWindow::new(10_000_000, 1_000_000),
            },
            engineers: PopulationConfig {
                count: 24,
                window: IdWindow::new(20_000_000, 1_000_000),
            },
            features: PopulationConfig {
                count: 40,
                window: IdWindow::new(1, 1_000),
            },
            bugs: PopulationConfig {
                count: 60,
                window: IdWindow::new(1, 1_000),
            },
            criteria_window: IdWindow::new(1, 10_000),
            ..Self::default()
        }
    }

    pub fn topic_ids(&self) -> Vec<i64> {
        (1..=self.topics.len() as i64).collect()
    }

    /// Reject configurations whose limits cannot be met.
    /// Runs before any write is attempted.
    pub fn validate(&self) -> GenResult<()> {
        if self.topics.is_empty() {
            return Err(GenError::config("topic catalog is empty"));
        }
        if self.topics.iter().any(|t| t.trim().is_empty()) {
            return Err(GenError::config("topic names must not be empty"));
        }

        for (label, pop) in [
            ("users", &self.users),
            ("engineers", &self.engineers),
            ("features", &self.features),
            ("bugs", &self.bugs),
        ] {
            let len = check_window(label, pop.window)?;
            if len < pop.count as u64 {
                return Err(GenError::config(format!(
                    "{label} window holds {len} ids but {} are requested",
                    pop.count
                )));
            }
        }
        let criteria_len = check_window("criteria", self.criteria_window)?;
        let criteria_needed = self.features.count as u64 * self.max_criteria_per_feature as u64;
        if criteria_len < criteria_needed {
            return Err(GenError::config(format!(
                "criteria window holds {criteria_len} ids but up to {criteria_needed} may be generated"
            )));
        }
        if self.max_criteria_per_feature == 0 {
            return Err(GenError::config("max_criteria_per_feature must be at least 1"));
        }

        check_limit(
            "max_specialties_per_engineer",
            self.max_specialties_per_engineer,
            limits::MAX_SPECIALTIES_PER_ENGINEER,
        )?;
        check_limit(
            "daily_submission_cap",
            self.daily_submission_cap,
            limits::DAILY_SUBMISSION_CAP,
        )?;
        check_limit(
            "assignment_fanout",
            self.assignment_fanout,
            limits::ASSIGNMENT_FANOUT,
        )?;

        if self.min_specialists_per_topic < self.assignment_fanout {
            return Err(GenError::config(format!(
                "min_specialists_per_topic ({}) is below assignment_fanout ({})",
                self.min_specialists_per_topic, self.assignment_fanout
            )));
        }

        let has_requests = self.features.count + self.bugs.count > 0;
        if has_requests && self.engineers.count < self.min_specialists_per_topic as usize {
            return Err(GenError::config(format!(
                "{} engineers cannot supply {} distinct specialists per topic",
                self.engineers.count, self.min_specialists_per_topic
            )));
        }
        let per_engineer = self.max_specialties_per_engineer.min(self.topics.len() as u32) as u64;
        let supply = self.engineers.count as u64 * per_engineer;
        let demand = self.topics.len() as u64 * self.min_specialists_per_topic as u64;
        if has_requests && supply < demand {
            return Err(GenError::config(format!(
                "{} engineers x {per_engineer} specialties cannot cover {} topics x {} specialists",
                self.engineers.count,
                self.topics.len(),
                self.min_specialists_per_topic
            )));
        }

        if self.dates.end < self.dates.start {
            return Err(GenError::config("date range ends before it starts"));
        }
        if has_requests && self.users.count == 0 {
            return Err(GenError::config("requests need at least one user"));
        }
        let slots = self.users.count as u64
            * self.dates.days() as u64
            * self.daily_submission_cap as u64;
        let needed = match self.daily_cap_scope {
            DailyCapScope::Shared => (self.features.count + self.bugs.count) as u64,
            DailyCapScope::PerKind => self.features.count.max(self.bugs.count) as u64,
        };
        if needed > slots {
            return Err(GenError::config(format!(
                "{needed} requests exceed {slots} submitter-day slots"
            )));
        }
        Ok(())
    }
}

/// A window must start at 1, hold at least one id and end inside `i64`.
/// Returns its length.
fn check_window(label: &str, window: IdWindow) -> GenResult<u64> {
    if window.start < 1 {
        return Err(GenError::config(format!("{label} window must start at 1 or above")));
    }
    if window.len < 1 {
        return Err(GenError::config(format!(
            "{label} window length must be at least 1, got {}",
            window.len
        )));
    }
    if window.start.checked_add(window.len).is_none() {
        return Err(GenError::config(format!("{label} window runs past the largest id")));
    }
    Ok(window.len as u64)
}

fn check_limit(name: &str, value: u32, schema_max: u32) -> GenResult<()> {
    if value == 0 {
        return Err(GenError::config(format!("{name} must be at least 1")));
    }
    if value > schema_max {
        return Err(GenError::config(format!(
            "{name} ({value}) exceeds the storage limit of {schema_max}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        GenConfig::default().validate().unwrap();
        GenConfig::default_test().validate().unwrap();
    }

    #[test]
    fn default_date_range_spans_three_years() {
        assert_eq!(GenConfig::default().dates.days(), 365 + 366 + 365);
    }

    #[test]
    fn partial_json_takes_defaults() {
        let config: GenConfig =
            serde_json::from_str(r#"{ "seed": 7, "daily_cap_scope": "shared" }"#).unwrap();
        assert_eq!(config.seed, 7);
        assert_eq!(config.daily_cap_scope, DailyCapScope::Shared);
        assert_eq!(config.engineers.count, 80);
        assert_eq!(config.topics.len(), 3);
    }

    #[test]
    fn unreachable_topic_coverage_is_rejected() {
        let mut config = GenConfig::default_test();
        config.engineers.count = 4;
        config.max_specialties_per_engineer = 1;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, GenError::Configuration { .. }), "{err}");
    }

    #[test]
    fn fanout_above_minimum_is_rejected() {
        let mut config = GenConfig::default_test();
        config.min_specialists_per_topic = 2;
        assert!(matches!(config.validate(), Err(GenError::Configuration { .. })));
    }

    #[test]
    fn limits_above_storage_triggers_are_rejected() {
        let mut config = GenConfig::default_test();
        config.daily_submission_cap = limits::DAILY_SUBMISSION_CAP + 1;
        assert!(matches!(config.validate(), Err(GenError::Configuration { .. })));
    }

    #[test]
    fn too_little_daily_capacity_is_rejected() {
        let mut config = GenConfig::default_test();
        config.users.count = 1;
        config.dates.end = config.dates.start;
        config.daily_submission_cap = 2;
        config.daily_cap_scope = DailyCapScope::Shared;
        assert!(matches!(config.validate(), Err(GenError::Configuration { .. })));
    }

    #[test]
    fn negative_window_is_rejected() {
        let mut config = GenConfig::default_test();
        config.users.window = IdWindow::new(10_000_000, -5);
        assert!(matches!(config.validate(), Err(GenError::Configuration { .. })));

        let mut config = GenConfig::default_test();
        config.criteria_window.len = 0;
        assert!(matches!(config.validate(), Err(GenError::Configuration { .. })));
    }

    #[test]
    fn window_past_the_largest_id_is_rejected() {
        let mut config = GenConfig::default_test();
        config.bugs.window = IdWindow::new(i64::MAX - 10, 1_000);
        assert!(matches!(config.validate(), Err(GenError::Configuration { .. })));
    }

    #[test]
    fn span_covers_the_first_count_ids() {
        let config = GenConfig::default_test();
        let span = config.features.span();
        assert_eq!(span.start, 1);
        assert_eq!(span.last(), 40);
    }

    #[test]
    fn window_smaller_than_population_is_rejected() {
        let mut config = GenConfig::default_test();
        config.engineers.window.len = 10;
        assert!(matches!(config.validate(), Err(GenError::Configuration { .. })));
    }
}
