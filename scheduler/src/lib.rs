pub mod classify;
pub mod engine;
pub mod types;

pub use classify::{Action, classify};
pub use engine::Engine;
pub use types::{CycleAction, CycleReport, EngineConfig, ReleasePolicy, RunMode};
