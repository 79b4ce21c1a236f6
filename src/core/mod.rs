pub mod engine;
pub mod simulator;
