pub mod engine;
pub mod ladder;
pub mod orchestrator;
