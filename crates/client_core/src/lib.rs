use async_trait::async_trait;
use shared::{
    domain::{GithubUserSummary, RepoFinding, RepoId, RepositoryRecord, SearchFormParams},
    protocol::CreatedIssue,
};

pub mod error;
pub mod notify;
pub mod projector;
pub mod transport;
pub mod view;
pub mod workflow;

pub use error::{GatewayOperation, NetworkError};
pub use notify::{Toast, ToastBoard, ToastKind};
pub use transport::HttpApiGateway;
pub use workflow::{
    BusyKind, ErrorInfo, OperationStatus, RepoSearch, SearchSession, WorkflowController,
    WorkflowPhase,
};

/// Network boundary to the scan service.
///
/// Implementations normalize an absent or `null` list to an empty `Vec`; an
/// empty result is a success, never a [`NetworkError`].
#[async_trait]
pub trait ApiGateway: Send + Sync {
    async fn find_users(&self, username: &str) -> Result<Vec<GithubUserSummary>, NetworkError>;
    async fn search_repos(
        &self,
        params: &SearchFormParams,
    ) -> Result<Vec<RepositoryRecord>, NetworkError>;
    async fn list_repos_for_user(&self, login: &str)
        -> Result<Vec<RepositoryRecord>, NetworkError>;
    async fn persist_repos(&self, repos: &[RepositoryRecord]) -> Result<(), NetworkError>;
    async fn fetch_findings_for_user(&self, login: &str)
        -> Result<Vec<RepoFinding>, NetworkError>;
    async fn create_issue(&self, repo_id: RepoId) -> Result<CreatedIssue, NetworkError>;
}

/// Presents one error and one success message at a time.
pub trait NotificationSink: Send + Sync {
    fn show_error(&self, message: &str);
    /// `link` is passed through untouched so the presenter can render it as a hyperlink.
    fn show_success(&self, message: &str, link: Option<&str>);
}
