// Export modules for testing
pub mod accounting;
pub mod binary;
pub mod chain;
pub mod cli;
pub mod client;
pub mod compiler;
pub mod config;
pub mod evaluator;
pub mod scenario;
pub mod state;
pub mod template;
