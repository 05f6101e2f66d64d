use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::ValidationError;

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_newtype!(RepoId);
id_newtype!(LinkId);

/// Prefix the scan service writes into `expandedUrl` when a short link could not be expanded.
pub const EXPANSION_ERROR_PREFIX: &str = "ERROR:";

pub const MAX_PAGES_TO_PROCESS: i64 = 10;

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|text| !text.trim().is_empty()))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GithubUserSummary {
    pub login: String,
    #[serde(default)]
    pub avatar_url: String,
    #[serde(
        rename = "name",
        default,
        deserialize_with = "blank_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub display_name: Option<String>,
}

/// A repository as listed by the scan service. Fields the client does not
/// interpret are carried in `extra` so a persist call re-sends them verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryRecord {
    pub name: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub stars: u64,
    #[serde(default)]
    pub forks: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gh_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clone_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_push: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RepoScanState {
    Pending,
    Processing,
    #[serde(alias = "COMPLETED")]
    Done,
    Error,
    Timeout,
    /// Any state this client does not know yet.
    #[serde(other)]
    Unknown,
}

impl RepoScanState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Processing => "PROCESSING",
            Self::Done => "DONE",
            Self::Error => "ERROR",
            Self::Timeout => "TIMEOUT",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for RepoScanState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkRecord {
    pub id: LinkId,
    #[serde(rename = "url")]
    pub short_url: String,
    pub expanded_url: String,
    #[serde(rename = "file")]
    pub source_file: String,
    pub line_number: u32,
    #[serde(rename = "githubUrl")]
    pub github_blob_url: String,
}

impl LinkRecord {
    pub fn expansion_failed(&self) -> bool {
        self.expanded_url.starts_with(EXPANSION_ERROR_PREFIX)
    }
}

/// One repository together with its scan outcome, as reported by the scan service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoFinding {
    pub id: RepoId,
    pub name: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub stars: u64,
    #[serde(default)]
    pub forks: u64,
    pub state: RepoScanState,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub links: Vec<LinkRecord>,
    #[serde(
        rename = "errorMsg",
        default,
        deserialize_with = "blank_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gh_url: Option<String>,
}

impl RepoFinding {
    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    pub fn failed_expansions(&self) -> usize {
        self.links.iter().filter(|link| link.expansion_failed()).count()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

impl FromStr for SortOrder {
    type Err = ValidationError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(Self::Asc),
            "desc" | "descending" => Ok(Self::Desc),
            other => Err(ValidationError::new(
                "sortOrder",
                format!("unknown sort order '{other}'"),
            )),
        }
    }
}

/// Inputs of the repository search form, remembered between runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchFormParams {
    pub query: String,
    pub sort_field: String,
    pub sort_order: SortOrder,
    pub start_page: i64,
    pub pages_to_process: i64,
}

impl Default for SearchFormParams {
    fn default() -> Self {
        Self {
            query: String::new(),
            sort_field: String::new(),
            sort_order: SortOrder::Desc,
            start_page: 0,
            pages_to_process: 1,
        }
    }
}

impl SearchFormParams {
    pub const SORT_FIELDS: [&'static str; 4] = ["", "stars", "forks", "updated"];

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.query.trim().is_empty() {
            return Err(ValidationError::new("query", "Query is required"));
        }
        if !Self::SORT_FIELDS.contains(&self.sort_field.as_str()) {
            return Err(ValidationError::new(
                "sortField",
                format!("Sort must be one of stars, forks or updated, got '{}'", self.sort_field),
            ));
        }
        if self.start_page < 0 {
            return Err(ValidationError::new(
                "startPage",
                "Start Page must be at least 0",
            ));
        }
        if self.pages_to_process < 1 {
            return Err(ValidationError::new(
                "pagesToProcess",
                "Pages to Process must be at least 1",
            ));
        }
        if self.pages_to_process > MAX_PAGES_TO_PROCESS {
            return Err(ValidationError::new(
                "pagesToProcess",
                format!("Pages to Process is limited to {MAX_PAGES_TO_PROCESS}"),
            ));
        }
        Ok(())
    }
}
