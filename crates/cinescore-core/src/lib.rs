pub mod config;
pub mod dataset;
pub mod error;
pub mod layout;
pub mod outcome;
pub mod types;

pub use config::CinescoreConfig;
pub use error::{CinescoreError, Result};
pub use layout::{ArtifactKind, DataLayout, DISTRIBUTED_ARTIFACTS};
pub use outcome::Outcome;
pub use types::*;
