//! Maven Central provider
//!
//! Fetches Java package versions from the Maven Central Search API and
//! dependencies from the published POM files.
//! API endpoints:
//! - https://search.maven.org/solrsearch/select
//! - https://repo1.maven.org/maven2/{group path}/{artifact}/{version}/{artifact}-{version}.pom
//!
//! Query format: q=g:{groupId}+AND+a:{artifactId}&core=gav&rows=200&start={n}&wt=json

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::LazyLock;
use tracing::debug;

use crate::domain::Ecosystem;
use crate::error::RegistryError;
use crate::registry::{or_empty, HttpClient, MetadataProvider};
use crate::version::compare_versions;

/// Maven Central Search API base URL
const MAVEN_CENTRAL_API_URL: &str = "https://search.maven.org/solrsearch/select";

/// Maven Central repository base URL
const MAVEN_REPOSITORY_URL: &str = "https://repo1.maven.org/maven2";

/// Versions fetched per search page
const PAGE_SIZE: usize = 200;

/// Sections whose `<dependency>` blocks are not requirements of the artifact
static IGNORED_SECTIONS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<dependencyManagement>.*?</dependencyManagement>|<build>.*?</build>|<exclusions>.*?</exclusions>")
        .unwrap()
});

static DEPENDENCY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<dependency>(.*?)</dependency>").unwrap());

static ELEMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<(groupId|artifactId|version|scope|optional)>\s*([^<]*?)\s*</").unwrap());

/// Maven Central provider
pub struct MavenCentralProvider {
    client: HttpClient,
}

/// Maven Central search response
#[derive(Debug, Default, Deserialize)]
struct MavenSearchResponse {
    #[serde(default)]
    response: MavenResponseBody,
}

/// Maven Central response body
#[derive(Debug, Default, Deserialize)]
struct MavenResponseBody {
    #[serde(default, rename = "numFound")]
    num_found: usize,
    #[serde(default)]
    docs: Vec<MavenVersionDoc>,
}

/// Maven Central version document
#[derive(Debug, Deserialize)]
struct MavenVersionDoc {
    /// Version string
    v: String,
}

/// Split `group:artifact` into its coordinates
fn coordinates<'a>(package: &'a str, registry: &str) -> Result<(&'a str, &'a str), RegistryError> {
    match package.split_once(':') {
        Some((group, artifact)) if !group.is_empty() && !artifact.is_empty() && !artifact.contains(':') => {
            Ok((group, artifact))
        }
        _ => Err(RegistryError::InvalidPackageName {
            name: package.to_string(),
            registry: registry.to_string(),
            reason: "expected format 'groupId:artifactId'".to_string(),
        }),
    }
}

/// Requirements declared by a POM document
///
/// Test, provided and optional dependencies are skipped. A dependency
/// without a literal version requires the latest release; a bare version
/// becomes an exact pin.
fn parse_pom(pom: &str) -> BTreeMap<String, String> {
    let pom = IGNORED_SECTIONS_RE.replace_all(pom, "");
    let mut requirements = BTreeMap::new();

    for block in DEPENDENCY_RE.captures_iter(&pom) {
        let mut fields: BTreeMap<&str, &str> = BTreeMap::new();
        for element in ELEMENT_RE.captures_iter(block.get(1).map_or("", |m| m.as_str())) {
            let (Some(tag), Some(value)) = (element.get(1), element.get(2)) else {
                continue;
            };
            fields.entry(tag.as_str()).or_insert(value.as_str());
        }

        let (Some(group), Some(artifact)) = (fields.get("groupId"), fields.get("artifactId")) else {
            continue;
        };
        if matches!(fields.get("scope"), Some(&"test") | Some(&"provided")) || fields.get("optional") == Some(&"true") {
            continue;
        }

        let constraint = match fields.get("version") {
            None => "latest".to_string(),
            Some(v) if v.is_empty() || v.contains("${") => {
                debug!(group, artifact, version = *v, "unresolved version, requiring latest");
                "latest".to_string()
            }
            Some(v) if v.starts_with('[') || v.starts_with('(') => v.to_string(),
            Some(v) => format!("[{}]", v),
        };
        requirements
            .entry(format!("{}:{}", group, artifact))
            .or_insert(constraint);
    }
    requirements
}

impl MavenCentralProvider {
    /// Create a new Maven Central provider
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }

    /// Build search URL for group:artifact, starting at `start`
    fn build_url(&self, package: &str, start: usize) -> Result<String, RegistryError> {
        let (group, artifact) = coordinates(package, self.registry_name())?;
        Ok(format!(
            "{}?q=g:{}+AND+a:{}&core=gav&rows={}&start={}&wt=json",
            MAVEN_CENTRAL_API_URL, group, artifact, PAGE_SIZE, start
        ))
    }

    /// Build the POM URL of one version
    fn pom_url(&self, package: &str, version: &str) -> Result<String, RegistryError> {
        let (group, artifact) = coordinates(package, self.registry_name())?;
        Ok(format!(
            "{}/{}/{}/{}/{}-{}.pom",
            MAVEN_REPOSITORY_URL,
            group.replace('.', "/"),
            artifact,
            version,
            artifact,
            version
        ))
    }
}

#[async_trait]
impl MetadataProvider for MavenCentralProvider {
    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::Maven
    }

    fn registry_name(&self) -> &'static str {
        "Maven Central"
    }

    async fn list_versions(&self, package: &str) -> Result<Vec<String>, RegistryError> {
        let mut versions = Vec::new();
        let mut start = 0;

        loop {
            let url = self.build_url(package, start)?;
            let page: MavenSearchResponse = or_empty(
                self.client
                    .get_json(&url, package, self.registry_name())
                    .await,
            )?;
            let fetched = page.response.docs.len();
            versions.extend(page.response.docs.into_iter().map(|d| d.v));
            start += fetched;
            if fetched == 0 || start >= page.response.num_found {
                break;
            }
        }

        versions.sort_by(|a, b| compare_versions(a, b));
        versions.dedup();
        Ok(versions)
    }

    async fn get_requirements(
        &self,
        package: &str,
        version: &str,
    ) -> Result<BTreeMap<String, String>, RegistryError> {
        let url = self.pom_url(package, version)?;
        let pom: String = or_empty(
            self.client
                .get_text(&url, package, self.registry_name())
                .await,
        )?;
        Ok(parse_pom(&pom))
    }
}
