use serde::{Deserialize, Serialize};

use crate::domain::{RepoId, SearchFormParams};

pub const API_PREFIX: &str = "/v1/api";
pub const SEARCH_REPOS_PATH: &str = "/search";
pub const SEARCH_USERS_PATH: &str = "/search-users";
pub const SEARCH_USER_REPOS_PATH: &str = "/search-repos";
pub const SAVE_REPOS_PATH: &str = "/save";
pub const USER_REPO_LINKS_PATH: &str = "/user-repo-links";
pub const CREATE_ISSUE_PATH: &str = "/create-issue";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsernameQuery {
    pub username: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateIssueRequest {
    pub repo_id: RepoId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedIssue {
    pub url: String,
}


#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchOptions {
    /// Empty means GitHub's best-match ordering.
    pub sort: String,
    pub order: String,
}

/// Body of a repository search. `current_page` is always sent as 0; the
/// service walks `pages_to_process` pages starting at `start_page`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchReposRequest {
    pub query: String,
    pub opts: SearchOptions,
    pub start_page: i64,
    pub current_page: i64,
    pub pages_to_process: i64,
}

impl From<&SearchFormParams> for SearchReposRequest {
    fn from(params: &SearchFormParams) -> Self {
        Self {
            query: params.query.trim().to_string(),
            opts: SearchOptions {
                sort: params.sort_field.clone(),
                order: params.sort_order.as_str().to_string(),
            },
            start_page: params.start_page,
            current_page: 0,
            pages_to_process: params.pages_to_process,
        }
    }
}
