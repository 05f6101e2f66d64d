//! Sort, filter and paginate pipeline shared by the user list, the repository
//! search results and the findings table.
//!
//! Everything here is pure: inputs are borrowed, outputs are freshly built.

use std::{cmp::Ordering, fmt, str::FromStr};

use shared::{
    domain::{GithubUserSummary, RepoFinding, RepositoryRecord},
    error::ValidationError,
};

/// A sortable field value. Numbers compare numerically, text case-sensitively,
/// and a missing value sorts before anything present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FieldValue<'a> {
    Absent,
    Number(u64),
    Text(&'a str),
}

pub trait Projectable {
    type Key: Copy;

    /// Field matched by the text filter.
    fn name(&self) -> &str;
    fn field(&self, key: Self::Key) -> FieldValue<'_>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortDirection {
    type Err = ValidationError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            other => Err(ValidationError::new(
                "order",
                format!("order must be asc or desc, got '{other}'"),
            )),
        }
    }
}

pub fn get_comparator<T: Projectable>(
    direction: SortDirection,
    key: T::Key,
) -> impl Fn(&T, &T) -> Ordering {
    move |a: &T, b: &T| {
        let ordering = a.field(key).cmp(&b.field(key));
        match direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    }
}

/// Stable-sorts a copy of `items`, then keeps those whose name contains
/// `filter_text` ignoring case. An empty filter keeps everything.
pub fn apply_filter<T, F>(items: &[T], comparator: F, filter_text: &str) -> Vec<T>
where
    T: Projectable + Clone,
    F: Fn(&T, &T) -> Ordering,
{
    let mut sorted = items.to_vec();
    sorted.sort_by(|a, b| comparator(a, b));
    if filter_text.is_empty() {
        return sorted;
    }
    let needle = filter_text.to_lowercase();
    sorted.retain(|item| item.name().to_lowercase().contains(&needle));
    sorted
}

/// Window `[page * page_size, page * page_size + page_size)` clamped to the slice.
pub fn paginate<T>(items: &[T], page: usize, page_size: usize) -> &[T] {
    let start = page.saturating_mul(page_size);
    if start >= items.len() {
        return &[];
    }
    let end = start.saturating_add(page_size).min(items.len());
    &items[start..end]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FindingKey {
    Name,
    Author,
    Language,
    Stars,
    Forks,
    State,
    Links,
}

impl FindingKey {
    pub const ALL: [FindingKey; 7] = [
        Self::Name,
        Self::Author,
        Self::Language,
        Self::Stars,
        Self::Forks,
        Self::State,
        Self::Links,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Author => "author",
            Self::Language => "language",
            Self::Stars => "stars",
            Self::Forks => "forks",
            Self::State => "state",
            Self::Links => "links",
        }
    }
}

impl FromStr for FindingKey {
    type Err = ValidationError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let raw = raw.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|key| key.as_str() == raw)
            .ok_or_else(|| ValidationError::new("orderBy", format!("unknown column '{raw}'")))
    }
}

impl Projectable for RepoFinding {
    type Key = FindingKey;

    fn name(&self) -> &str {
        &self.name
    }

    fn field(&self, key: FindingKey) -> FieldValue<'_> {
        match key {
            FindingKey::Name => FieldValue::Text(&self.name),
            FindingKey::Author => FieldValue::Text(&self.author),
            FindingKey::Language => FieldValue::Text(&self.language),
            FindingKey::Stars => FieldValue::Number(self.stars),
            FindingKey::Forks => FieldValue::Number(self.forks),
            FindingKey::State => FieldValue::Text(self.state.as_str()),
            FindingKey::Links => FieldValue::Number(self.link_count() as u64),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepoKey {
    Name,
    Author,
    Language,
    Stars,
    Forks,
}

impl RepoKey {
    pub const ALL: [RepoKey; 5] = [
        Self::Name,
        Self::Author,
        Self::Language,
        Self::Stars,
        Self::Forks,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Author => "author",
            Self::Language => "language",
            Self::Stars => "stars",
            Self::Forks => "forks",
        }
    }
}

impl FromStr for RepoKey {
    type Err = ValidationError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let raw = raw.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|key| key.as_str() == raw)
            .ok_or_else(|| ValidationError::new("orderBy", format!("unknown column '{raw}'")))
    }
}

impl Projectable for RepositoryRecord {
    type Key = RepoKey;

    fn name(&self) -> &str {
        &self.name
    }

    fn field(&self, key: RepoKey) -> FieldValue<'_> {
        match key {
            RepoKey::Name => FieldValue::Text(&self.name),
            RepoKey::Author => FieldValue::Text(&self.author),
            RepoKey::Language => FieldValue::Text(&self.language),
            RepoKey::Stars => FieldValue::Number(self.stars),
            RepoKey::Forks => FieldValue::Number(self.forks),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UserKey {
    Login,
    DisplayName,
}

impl FromStr for UserKey {
    type Err = ValidationError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "login" => Ok(Self::Login),
            "name" | "display_name" => Ok(Self::DisplayName),
            other => Err(ValidationError::new(
                "orderBy",
                format!("unknown column '{other}'"),
            )),
        }
    }
}

impl Projectable for GithubUserSummary {
    type Key = UserKey;

    fn name(&self) -> &str {
        &self.login
    }

    fn field(&self, key: UserKey) -> FieldValue<'_> {
        match key {
            UserKey::Login => FieldValue::Text(&self.login),
            UserKey::DisplayName => self
                .display_name
                .as_deref()
                .map_or(FieldValue::Absent, FieldValue::Text),
        }
    }
}

#[cfg(test)]
#[path = "tests/projector_tests.rs"]
mod tests;
