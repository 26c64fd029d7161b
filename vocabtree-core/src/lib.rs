//! # vocabtree Core
//!
//! This crate provides the building blocks shared by every vocabulary
//! structure:
//! - Match and parameter value types
//! - Error types
//! - Configuration
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                 vocabtree-core                  │
//! ├─────────────────────────────────────────────────┤
//! │  • types   - Match, Parameters, modes          │
//! │  • error   - Error handling                    │
//! │  • config  - TOML-backed configuration         │
//! └─────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod types;

// Re-export commonly used types
pub use config::Config;
pub use error::{Error, Result};
pub use types::{
    DistanceValue, InitializationStrategy, Match, Matches, MatchingMode, Parameters,
    INVALID_MATCH_INDEX,
};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
