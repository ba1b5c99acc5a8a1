//! Core domain models for depconf
//!
//! This module contains the fundamental types used throughout the crate:
//! - Ecosystem types for supported registries
//! - Package and version records with serial numbers and impact attributes
//! - Graph snapshots (requirement edges and have facts)
//! - Configurations and operation outcomes

mod configuration;
mod ecosystem;
mod package;
mod snapshot;

pub use configuration::{ChosenVersion, Configuration, Outcome};
pub use ecosystem::Ecosystem;
pub use package::{ImpactAttributes, Package, SerialNumber, Version};
pub use snapshot::{
    Depth, EdgeKind, GraphSnapshot, GraphSummary, HaveFact, ParentRef, RequirementEdge,
};
