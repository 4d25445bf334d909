//! Removing generated data.
//!
//! `All` empties every table. `Window` deletes only the identifier windows
//! a configuration generates into, plus everything that references them,
//! so unrelated data sharing the database survives. Either mode is one
//! transaction.

use crate::{config::GenConfig, error::GenResult, store::TrackerStore, types::IdWindow};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TeardownScope {
    pub users: IdWindow,
    pub engineers: IdWindow,
    pub features: IdWindow,
    pub bugs: IdWindow,
}

impl TeardownScope {
    pub fn from_config(config: &GenConfig) -> Self {
        Self {
            users: config.users.window,
            engineers: config.engineers.window,
            features: config.features.window,
            bugs: config.bugs.window,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeardownMode {
    All,
    Window(TeardownScope),
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TeardownReport {
    /// Rows deleted per table, in deletion order.
    pub deleted: Vec<(&'static str, usize)>,
}

impl TeardownReport {
    pub fn total(&self) -> usize {
        self.deleted.iter().map(|(_, n)| n).sum()
    }
}

pub fn teardown(store: &TrackerStore, mode: &TeardownMode) -> GenResult<TeardownReport> {
    let deleted = store.with_transaction(|s| match mode {
        TeardownMode::All => s.delete_all(),
        TeardownMode::Window(scope) => s.delete_windows(scope),
    })?;
    let report = TeardownReport { deleted };
    log::info!("teardown: {} rows deleted ({mode:?})", report.total());
    Ok(report)
}
