//! depconf - dependency graph constraint modeling library
//!
//! This library turns dependency graph snapshots from several ecosystems
//! into symbolic constraint models and answers questions about them:
//! - Version totalization: one integer serial number per version
//! - Constraint normalization for PyPI, npm, Cargo, Maven, NuGet and RubyGems
//! - Model building, caching and freshness tracking
//! - Validity checks, impact minimization/maximization, threshold
//!   filtering, closest-to-target search and completion of partial
//!   configurations

pub mod cli;
pub mod config;
pub mod constraint;
pub mod domain;
pub mod enrich;
pub mod error;
pub mod logging;
pub mod model;
pub mod output;
pub mod progress;
pub mod registry;
pub mod request;
pub mod service;
pub mod solver;
pub mod store;
pub mod version;
