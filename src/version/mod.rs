//! Version ordering and serial number assignment
//!
//! This module provides:
//! - Parsing of raw version strings into ordering components
//! - The natural release order shared by every ecosystem
//! - The totalizer mapping version strings to order-preserving integers

mod parsed;
mod totalizer;

pub use parsed::{compare_versions, ParsedVersion, Stage};
pub use totalizer::{assign_serials, slot_base, totalize, FALLBACK_BASE};
