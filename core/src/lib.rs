pub mod allocator;
pub mod attributes;
pub mod config;
pub mod error;
pub mod generator;
pub mod ledger;
pub mod rng;
pub mod scheduler;
pub mod specialty;
pub mod store;
pub mod teardown;
pub mod types;
