use std::fmt;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GatewayOperation {
    FindUsers,
    SearchRepos,
    ListRepos,
    PersistRepos,
    FetchFindings,
    CreateIssue,
}

impl GatewayOperation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FindUsers => "find_users",
            Self::SearchRepos => "search_repos",
            Self::ListRepos => "list_repos_for_user",
            Self::PersistRepos => "persist_repos",
            Self::FetchFindings => "fetch_findings_for_user",
            Self::CreateIssue => "create_issue",
        }
    }

    fn activity(self) -> &'static str {
        match self {
            Self::FindUsers => "searching GitHub users",
            Self::SearchRepos => "searching repositories",
            Self::ListRepos => "listing repositories",
            Self::PersistRepos => "saving repositories",
            Self::FetchFindings => "loading link findings",
            Self::CreateIssue => "creating the issue",
        }
    }
}

impl fmt::Display for GatewayOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure of a single scan-service call, independent of the HTTP client in use.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NetworkError {
    #[error("{operation}: transport failure: {detail}")]
    Transport {
        operation: GatewayOperation,
        detail: String,
    },
    #[error("{operation}: HTTP {status}{}", .message.as_deref().map(|m| format!(": {m}")).unwrap_or_default())]
    Status {
        operation: GatewayOperation,
        status: u16,
        message: Option<String>,
    },
    #[error("{operation}: undecodable response: {detail}")]
    Decode {
        operation: GatewayOperation,
        detail: String,
    },
}

impl NetworkError {
    pub fn operation(&self) -> GatewayOperation {
        match self {
            Self::Transport { operation, .. }
            | Self::Status { operation, .. }
            | Self::Decode { operation, .. } => *operation,
        }
    }

    /// The one sentence shown to the operator. Transport details stay in the log.
    pub fn user_message(&self) -> String {
        let activity = self.operation().activity();
        match self {
            Self::Status {
                message: Some(message),
                ..
            } if !message.trim().is_empty() => message.trim().to_string(),
            Self::Status { status, .. } => {
                format!("The scan service rejected {activity} (HTTP {status}). Please retry.")
            }
            Self::Transport { .. } => {
                format!("Could not reach the scan service while {activity}. Please retry.")
            }
            Self::Decode { .. } => {
                format!("The scan service sent an unexpected response while {activity}.")
            }
        }
    }
}
