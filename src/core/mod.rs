pub mod types;
pub mod config;
pub mod error;
pub mod stats;
pub mod engine;

pub use engine::PodEngine;
