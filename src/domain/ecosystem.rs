//! Ecosystem type definitions for supported package registries

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Supported package ecosystems
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ecosystem {
    /// Java ecosystem (pom.xml, Maven Central)
    Maven,
    /// .NET ecosystem (NuGet)
    NuGet,
    /// Python ecosystem (PyPI)
    PyPI,
    /// JavaScript ecosystem (npm registry)
    Npm,
    /// Rust ecosystem (crates.io)
    Cargo,
    /// Ruby ecosystem (RubyGems)
    RubyGems,
}

impl Ecosystem {
    /// Returns the display name for this ecosystem
    pub fn display_name(&self) -> &'static str {
        match self {
            Ecosystem::Maven => "Maven",
            Ecosystem::NuGet => "NuGet",
            Ecosystem::PyPI => "PyPI",
            Ecosystem::Npm => "npm",
            Ecosystem::Cargo => "Cargo",
            Ecosystem::RubyGems => "RubyGems",
        }
    }

    /// Returns the registry name used in log and error messages
    pub fn registry_name(&self) -> &'static str {
        match self {
            Ecosystem::Maven => "Maven Central",
            Ecosystem::NuGet => "NuGet",
            Ecosystem::PyPI => "PyPI",
            Ecosystem::Npm => "npm",
            Ecosystem::Cargo => "crates.io",
            Ecosystem::RubyGems => "RubyGems",
        }
    }

    /// Returns all supported ecosystems
    pub fn all() -> &'static [Ecosystem] {
        &[
            Ecosystem::Maven,
            Ecosystem::NuGet,
            Ecosystem::PyPI,
            Ecosystem::Npm,
            Ecosystem::Cargo,
            Ecosystem::RubyGems,
        ]
    }
}

impl fmt::Display for Ecosystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl FromStr for Ecosystem {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "maven" | "mavenpackage" => Ok(Ecosystem::Maven),
            "nuget" | "nugetpackage" => Ok(Ecosystem::NuGet),
            "pypi" | "pypipackage" | "python" => Ok(Ecosystem::PyPI),
            "npm" | "npmpackage" | "node" => Ok(Ecosystem::Npm),
            "cargo" | "cargopackage" | "rust" => Ok(Ecosystem::Cargo),
            "rubygems" | "rubygemspackage" | "ruby" => Ok(Ecosystem::RubyGems),
            other => Err(format!("unsupported ecosystem '{}'", other)),
        }
    }
}
