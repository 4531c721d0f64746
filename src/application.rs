//! Application module - orchestration over the domain seams
//!
//! The planner enumerates work units; the harvester drives them through the
//! fetcher, writer and progress store injected by the caller.

pub mod harvester;
pub mod planner;

pub use harvester::{HarvestConfig, HarvestSummary, Harvester};
pub use planner::plan;
