pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod hash;
pub mod report;
pub mod store;
pub mod technique;
pub mod util;

pub use engine::SnapshotEngine;
pub use error::{Error, Result};
pub use technique::Technique;
