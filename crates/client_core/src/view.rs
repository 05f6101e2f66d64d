//! Table state and the panels a presenter renders from a [`SearchSession`].

use shared::{
    domain::{GithubUserSummary, RepoFinding, RepositoryRecord},
    error::ValidationError,
};

use crate::{
    projector::{
        apply_filter, get_comparator, paginate, FindingKey, Projectable, RepoKey, SortDirection,
        UserKey,
    },
    SearchSession, WorkflowPhase,
};

pub const ROWS_PER_PAGE_OPTIONS: [usize; 3] = [5, 10, 25];
pub const DEFAULT_ROWS_PER_PAGE: usize = 10;

/// Sort, filter and page position of one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableQuery<K> {
    pub direction: SortDirection,
    pub order_by: K,
    pub filter_text: String,
    pub page: usize,
    pub rows_per_page: usize,
}

impl<K: Copy + PartialEq> TableQuery<K> {
    pub fn new(order_by: K) -> Self {
        Self {
            direction: SortDirection::Asc,
            order_by,
            filter_text: String::new(),
            page: 0,
            rows_per_page: DEFAULT_ROWS_PER_PAGE,
        }
    }

    /// Re-requesting the active ascending column flips it to descending;
    /// anything else sorts ascending by `key`.
    pub fn request_sort(&mut self, key: K) {
        let active_asc = self.order_by == key && self.direction == SortDirection::Asc;
        self.direction = if active_asc {
            SortDirection::Desc
        } else {
            SortDirection::Asc
        };
        self.order_by = key;
    }

    pub fn set_filter(&mut self, filter_text: impl Into<String>) {
        self.filter_text = filter_text.into();
        self.page = 0;
    }

    pub fn set_rows_per_page(&mut self, rows_per_page: usize) -> Result<(), ValidationError> {
        if !ROWS_PER_PAGE_OPTIONS.contains(&rows_per_page) {
            return Err(ValidationError::new(
                "rowsPerPage",
                format!("Rows per page must be one of 5, 10 or 25, got {rows_per_page}"),
            ));
        }
        self.rows_per_page = rows_per_page;
        self.page = 0;
        Ok(())
    }

    pub fn set_page(&mut self, page: usize) {
        self.page = page;
    }

    pub fn project<T>(&self, items: &[T]) -> ProjectedPage<T>
    where
        T: Projectable<Key = K> + Clone,
    {
        let matched = apply_filter(
            items,
            get_comparator::<T>(self.direction, self.order_by),
            &self.filter_text,
        );
        ProjectedPage {
            rows: paginate(&matched, self.page, self.rows_per_page).to_vec(),
            matched: matched.len(),
            total: items.len(),
            page: self.page,
            rows_per_page: self.rows_per_page,
        }
    }
}

impl Default for TableQuery<FindingKey> {
    fn default() -> Self {
        Self::new(FindingKey::Name)
    }
}

impl Default for TableQuery<RepoKey> {
    fn default() -> Self {
        Self::new(RepoKey::Name)
    }
}

impl Default for TableQuery<UserKey> {
    fn default() -> Self {
        Self::new(UserKey::Login)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectedPage<T> {
    pub rows: Vec<T>,
    /// Items left after filtering, across all pages.
    pub matched: usize,
    pub total: usize,
    pub page: usize,
    pub rows_per_page: usize,
}

impl<T> ProjectedPage<T> {
    pub fn page_count(&self) -> usize {
        self.matched.div_ceil(self.rows_per_page.max(1))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UsersPanel {
    NotSearched,
    Loading,
    NoUsersFound,
    Users(ProjectedPage<GithubUserSummary>),
}

pub fn users_panel(session: &SearchSession, query: &TableQuery<UserKey>) -> UsersPanel {
    match session.phase {
        WorkflowPhase::Idle => UsersPanel::NotSearched,
        WorkflowPhase::SearchingUser => UsersPanel::Loading,
        _ if !session.candidate_users.is_empty() => {
            UsersPanel::Users(query.project(&session.candidate_users))
        }
        WorkflowPhase::UsersShown if session.username.is_some() => UsersPanel::NoUsersFound,
        _ => UsersPanel::NotSearched,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepoResultsPanel {
    NotSearched,
    NoRepos { query: String },
    NoMatches { filter_text: String },
    Rows(ProjectedPage<RepositoryRecord>),
}

pub fn repo_results_panel(
    session: &SearchSession,
    query: &TableQuery<RepoKey>,
) -> RepoResultsPanel {
    let Some(search) = &session.repo_search else {
        return RepoResultsPanel::NotSearched;
    };
    if search.repos.is_empty() {
        return RepoResultsPanel::NoRepos {
            query: search.query.clone(),
        };
    }
    let page = query.project(&search.repos);
    if page.matched == 0 {
        RepoResultsPanel::NoMatches {
            filter_text: query.filter_text.clone(),
        }
    } else {
        RepoResultsPanel::Rows(page)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FindingsPanel {
    Hidden,
    Loading { login: String },
    NoRepos { login: String },
    NoFindings { login: String },
    NoMatches { filter_text: String },
    Rows(ProjectedPage<RepoFinding>),
}

/// Findings stay on screen after a failed refresh so the last good snapshot
/// remains readable.
pub fn findings_panel(session: &SearchSession, query: &TableQuery<FindingKey>) -> FindingsPanel {
    let login = session.selected_user.clone().unwrap_or_default();
    match session.phase {
        WorkflowPhase::ResolvingUser => FindingsPanel::Loading { login },
        WorkflowPhase::ResultsShown | WorkflowPhase::Failed if !session.findings.is_empty() => {
            let page = query.project(&session.findings);
            if page.matched == 0 {
                FindingsPanel::NoMatches {
                    filter_text: query.filter_text.clone(),
                }
            } else {
                FindingsPanel::Rows(page)
            }
        }
        WorkflowPhase::ResultsShown if session.repo_count == Some(0) => {
            FindingsPanel::NoRepos { login }
        }
        WorkflowPhase::ResultsShown => FindingsPanel::NoFindings { login },
        _ => FindingsPanel::Hidden,
    }
}

#[cfg(test)]
#[path = "tests/view_tests.rs"]
mod tests;
