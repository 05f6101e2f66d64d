//! reqwest implementation of [`ApiGateway`] against the scan service's `/v1/api` routes.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use shared::{
    domain::{GithubUserSummary, RepoFinding, RepoId, RepositoryRecord, SearchFormParams},
    error::ApiError,
    protocol::{
        CreateIssueRequest, CreatedIssue, SearchReposRequest, UsernameQuery, CREATE_ISSUE_PATH,
        SAVE_REPOS_PATH, SEARCH_REPOS_PATH, SEARCH_USERS_PATH, SEARCH_USER_REPOS_PATH,
        USER_REPO_LINKS_PATH,
    },
};
use tracing::{debug, warn};

use crate::{ApiGateway, GatewayOperation, NetworkError};

pub struct HttpApiGateway {
    http: Client,
    base_url: String,
}

impl HttpApiGateway {
    /// `base_url` includes the API prefix, e.g. `http://localhost:8080/v1/api`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    pub fn with_client(base_url: impl Into<String>, http: Client) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { http, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn send(
        &self,
        operation: GatewayOperation,
        request: RequestBuilder,
    ) -> Result<Response, NetworkError> {
        let response = request
            .send()
            .await
            .map_err(|e| NetworkError::Transport {
                operation,
                detail: e.to_string(),
            })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiError>(&body)
            .ok()
            .map(|api_error| api_error.message)
            .filter(|message| !message.trim().is_empty());
        warn!(
            operation = %operation,
            status = status.as_u16(),
            body = %body,
            "scan service returned an error status"
        );
        Err(NetworkError::Status {
            operation,
            status: status.as_u16(),
            message,
        })
    }

    async fn read_json<T: DeserializeOwned>(
        operation: GatewayOperation,
        response: Response,
    ) -> Result<T, NetworkError> {
        let bytes = response
            .bytes()
            .await
            .map_err(|e| NetworkError::Transport {
                operation,
                detail: e.to_string(),
            })?;
        serde_json::from_slice(&bytes).map_err(|e| NetworkError::Decode {
            operation,
            detail: e.to_string(),
        })
    }

    /// Reads a JSON list where an empty body or `null` means "no items".
    async fn read_list<T: DeserializeOwned>(
        operation: GatewayOperation,
        response: Response,
    ) -> Result<Vec<T>, NetworkError> {
        let bytes = response
            .bytes()
            .await
            .map_err(|e| NetworkError::Transport {
                operation,
                detail: e.to_string(),
            })?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }
        let items: Option<Vec<T>> =
            serde_json::from_slice(&bytes).map_err(|e| NetworkError::Decode {
                operation,
                detail: e.to_string(),
            })?;
        Ok(items.unwrap_or_default())
    }

    async fn get_list_for_user<T: DeserializeOwned>(
        &self,
        operation: GatewayOperation,
        path: &str,
        username: &str,
    ) -> Result<Vec<T>, NetworkError> {
        let request = self.http.get(self.endpoint(path)).query(&UsernameQuery {
            username: username.to_string(),
        });
        let response = self.send(operation, request).await?;
        let items = Self::read_list(operation, response).await?;
        debug!(operation = %operation, username, count = items.len(), "scan service list loaded");
        Ok(items)
    }
}

#[async_trait]
impl ApiGateway for HttpApiGateway {
    async fn find_users(&self, username: &str) -> Result<Vec<GithubUserSummary>, NetworkError> {
        // The service rejects a blank username; a blank search simply has no matches.
        if username.trim().is_empty() {
            debug!("blank username search short-circuited to no candidates");
            return Ok(Vec::new());
        }
        self.get_list_for_user(GatewayOperation::FindUsers, SEARCH_USERS_PATH, username)
            .await
    }

    async fn search_repos(
        &self,
        params: &SearchFormParams,
    ) -> Result<Vec<RepositoryRecord>, NetworkError> {
        let operation = GatewayOperation::SearchRepos;
        let body = SearchReposRequest::from(params);
        let request = self.http.post(self.endpoint(SEARCH_REPOS_PATH)).json(&body);
        let response = self.send(operation, request).await?;
        let repos: Vec<RepositoryRecord> = Self::read_list(operation, response).await?;
        debug!(
            query = %body.query,
            start_page = body.start_page,
            pages = body.pages_to_process,
            count = repos.len(),
            "repository search completed"
        );
        Ok(repos)
    }

    async fn list_repos_for_user(
        &self,
        login: &str,
    ) -> Result<Vec<RepositoryRecord>, NetworkError> {
        self.get_list_for_user(GatewayOperation::ListRepos, SEARCH_USER_REPOS_PATH, login)
            .await
    }

    async fn persist_repos(&self, repos: &[RepositoryRecord]) -> Result<(), NetworkError> {
        let request = self.http.post(self.endpoint(SAVE_REPOS_PATH)).json(repos);
        self.send(GatewayOperation::PersistRepos, request).await?;
        debug!(count = repos.len(), "repositories saved");
        Ok(())
    }

    async fn fetch_findings_for_user(
        &self,
        login: &str,
    ) -> Result<Vec<RepoFinding>, NetworkError> {
        self.get_list_for_user(GatewayOperation::FetchFindings, USER_REPO_LINKS_PATH, login)
            .await
    }

    async fn create_issue(&self, repo_id: RepoId) -> Result<CreatedIssue, NetworkError> {
        let operation = GatewayOperation::CreateIssue;
        let request = self
            .http
            .post(self.endpoint(CREATE_ISSUE_PATH))
            .json(&CreateIssueRequest { repo_id });
        let response = self.send(operation, request).await?;
        let issue: CreatedIssue = Self::read_json(operation, response).await?;
        debug!(repo_id = repo_id.0, url = %issue.url, "issue created");
        Ok(issue)
    }
}

#[cfg(test)]
#[path = "tests/transport_tests.rs"]
mod tests;
