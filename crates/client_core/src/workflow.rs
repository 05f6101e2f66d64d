//! Search → select → resolve lifecycle of one operator session.
//!
//! The session lives behind a plain mutex that is only ever locked between
//! awaits. Two busy flags (searching, resolving) are the re-entrancy guards;
//! they are released by [`BusyGuard`] on drop, so a cancelled operation never
//! leaves the controller stuck.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use shared::{
    domain::{GithubUserSummary, RepoFinding, RepoId, RepositoryRecord, SearchFormParams},
    error::ValidationError,
};
use storage::SessionStore;
use tracing::{debug, info, warn};

use crate::{ApiGateway, GatewayOperation, NetworkError, NotificationSink};

const NO_SELECTED_USER: &str = "Select a user before refreshing findings.";
const NO_REPO_RESULTS: &str = "Search for repositories before saving them.";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum WorkflowPhase {
    #[default]
    Idle,
    SearchingUser,
    UsersShown,
    ResolvingUser,
    ResultsShown,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BusyKind {
    Searching,
    Resolving,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationStatus {
    Completed,
    /// The failure has already been recorded in `last_error` and notified.
    Failed,
    /// Another search or resolve was in flight; nothing changed.
    Rejected(BusyKind),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorInfo {
    pub operation: GatewayOperation,
    pub message: String,
}

/// Outcome of the last repository search, kept apart from the user workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoSearch {
    pub query: String,
    pub repos: Vec<RepositoryRecord>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchSession {
    /// Last username submitted to the user search.
    pub username: Option<String>,
    pub candidate_users: Vec<GithubUserSummary>,
    pub selected_user: Option<String>,
    pub findings: Vec<RepoFinding>,
    /// Repositories listed for the selected user, once known.
    pub repo_count: Option<usize>,
    pub phase: WorkflowPhase,
    pub last_error: Option<ErrorInfo>,
    pub repo_search: Option<RepoSearch>,
}

#[derive(Default)]
struct ControllerState {
    session: SearchSession,
    form: SearchFormParams,
    searching: bool,
    resolving: bool,
}

struct BusyGuard<'a> {
    state: &'a Mutex<ControllerState>,
    kind: BusyKind,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        match self.kind {
            BusyKind::Searching => state.searching = false,
            BusyKind::Resolving => state.resolving = false,
        }
    }
}

pub struct WorkflowController {
    gateway: Arc<dyn ApiGateway>,
    store: SessionStore,
    notifier: Arc<dyn NotificationSink>,
    state: Mutex<ControllerState>,
}

impl WorkflowController {
    pub fn new(
        gateway: Arc<dyn ApiGateway>,
        store: SessionStore,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            gateway,
            store,
            notifier,
            state: Mutex::new(ControllerState::default()),
        }
    }

    pub fn session(&self) -> SearchSession {
        self.lock_state().session.clone()
    }

    pub fn phase(&self) -> WorkflowPhase {
        self.lock_state().session.phase
    }

    pub fn is_busy(&self) -> bool {
        let state = self.lock_state();
        state.searching || state.resolving
    }

    pub fn search_form(&self) -> SearchFormParams {
        self.lock_state().form.clone()
    }

    /// Validates `params` and persists them immediately.
    pub async fn update_search_form(&self, params: SearchFormParams) -> Result<(), ValidationError> {
        params.validate()?;
        self.lock_state().form = params.clone();
        if let Err(error) = self.store.save_search_form(&params).await {
            warn!(error = %format!("{error:#}"), "search form not persisted");
        }
        Ok(())
    }

    /// Loads the persisted search form, if any, and returns the form now in use.
    pub async fn restore_search_form(&self) -> SearchFormParams {
        if let Some(form) = self.store.search_form().await {
            self.lock_state().form = form;
        }
        self.search_form()
    }

    /// Runs the current search form against GitHub through the scan service.
    /// Results land in `repo_search`; the user workflow phase is left alone.
    pub async fn search_repositories(&self) -> OperationStatus {
        let _guard = match self.try_begin(BusyKind::Searching, |_| {}) {
            Ok(guard) => guard,
            Err(busy) => return Self::rejected("search_repositories", busy),
        };

        let form = self.search_form();
        if let Err(error) = form.validate() {
            warn!(field = error.field, message = %error.message, "repository search form invalid");
            self.report_message(GatewayOperation::SearchRepos, error.message);
            return OperationStatus::Failed;
        }
        self.with_session(|session| {
            session.repo_search = None;
            session.last_error = None;
        });

        match self.gateway.search_repos(&form).await {
            Ok(repos) => {
                let count = repos.len();
                let query = form.query.trim().to_string();
                info!(query = %query, count, "repository search completed");
                self.notifier.show_success(
                    &format!("Found {count} {} matching '{query}'.", plural(count, "repo")),
                    None,
                );
                self.with_session(|session| {
                    session.repo_search = Some(RepoSearch { query, repos });
                });
                OperationStatus::Completed
            }
            Err(error) => {
                self.report(&error);
                OperationStatus::Failed
            }
        }
    }

    /// Saves the repositories from the last search to the scan service.
    pub async fn save_repo_results(&self) -> OperationStatus {
        let _guard = match self.try_begin(BusyKind::Searching, |_| {}) {
            Ok(guard) => guard,
            Err(busy) => return Self::rejected("save_repo_results", busy),
        };

        let repos = self.with_session(|session| {
            session
                .repo_search
                .as_ref()
                .map(|search| search.repos.clone())
                .unwrap_or_default()
        });
        if repos.is_empty() {
            self.report_message(GatewayOperation::PersistRepos, NO_REPO_RESULTS.to_string());
            return OperationStatus::Failed;
        }

        match self.gateway.persist_repos(&repos).await {
            Ok(()) => {
                let count = repos.len();
                info!(count, "searched repositories saved");
                self.notifier
                    .show_success(&format!("{count} {} saved.", plural(count, "repo")), None);
                OperationStatus::Completed
            }
            Err(error) => {
                self.report(&error);
                OperationStatus::Failed
            }
        }
    }

    pub async fn start_user_search(&self, username: &str) -> OperationStatus {
        let username = username.trim().to_string();
        let _guard = match self.try_begin(BusyKind::Searching, |session| {
            session.phase = WorkflowPhase::SearchingUser;
            session.username = Some(username.clone());
            session.candidate_users.clear();
            session.selected_user = None;
            session.findings.clear();
            session.repo_count = None;
            session.last_error = None;
        }) {
            Ok(guard) => guard,
            Err(busy) => return Self::rejected("start_user_search", busy),
        };

        if let Err(error) = self.store.clear_selected_user().await {
            warn!(error = %format!("{error:#}"), "persisted selected user not cleared");
        }

        match self.gateway.find_users(&username).await {
            Ok(users) => {
                info!(username = %username, candidates = users.len(), "user search completed");
                self.with_session(|session| {
                    session.candidate_users = users;
                    session.phase = WorkflowPhase::UsersShown;
                });
                OperationStatus::Completed
            }
            Err(error) => {
                self.fail(error, |session| session.candidate_users.clear());
                OperationStatus::Failed
            }
        }
    }

    /// Lists the user's repositories, saves them, then loads their link findings.
    pub async fn select_user(&self, login: &str) -> OperationStatus {
        let login = login.trim().to_string();
        let _guard = match self.try_begin(BusyKind::Resolving, |session| {
            session.selected_user = Some(login.clone());
            session.phase = WorkflowPhase::ResolvingUser;
            session.findings.clear();
            session.repo_count = None;
            session.last_error = None;
        }) {
            Ok(guard) => guard,
            Err(busy) => return Self::rejected("select_user", busy),
        };

        let repos = match self.gateway.list_repos_for_user(&login).await {
            Ok(repos) => repos,
            Err(error) => {
                self.fail(error, |session| session.findings.clear());
                return OperationStatus::Failed;
            }
        };
        let repo_count = repos.len();
        self.with_session(|session| session.repo_count = Some(repo_count));
        debug!(login = %login, repo_count, "repositories listed");

        if let Err(error) = self.gateway.persist_repos(&repos).await {
            debug!(login = %login, "loading findings despite the failed save");
            self.report(&error);
        }

        match self.gateway.fetch_findings_for_user(&login).await {
            Ok(findings) => {
                info!(login = %login, repo_count, findings = findings.len(), "user resolved");
                self.with_session(|session| {
                    session.findings = findings;
                    session.phase = WorkflowPhase::ResultsShown;
                });
                if let Err(error) = self.store.save_selected_user(&login).await {
                    warn!(login = %login, error = %format!("{error:#}"), "selected user not persisted");
                }
                self.notifier.show_success(&found_repos_message(repo_count, &login), None);
                OperationStatus::Completed
            }
            Err(error) => {
                self.fail(error, |session| session.findings.clear());
                OperationStatus::Failed
            }
        }
    }

    /// Reloads findings for the selected user, falling back to the persisted one.
    pub async fn refresh_findings(&self) -> OperationStatus {
        let _guard = match self.try_begin(BusyKind::Resolving, |_| {}) {
            Ok(guard) => guard,
            Err(busy) => return Self::rejected("refresh_findings", busy),
        };

        let in_memory = self.with_session(|session| session.selected_user.clone());
        let login = match in_memory {
            Some(login) => Some(login),
            None => self.store.selected_user().await,
        };
        let Some(login) = login else {
            warn!("refresh requested with no selected user");
            self.report_message(GatewayOperation::FetchFindings, NO_SELECTED_USER.to_string());
            return OperationStatus::Failed;
        };

        match self.gateway.fetch_findings_for_user(&login).await {
            Ok(findings) => {
                self.show_refreshed(&login, findings);
                OperationStatus::Completed
            }
            Err(error) => {
                // Keep the last good snapshot on screen.
                self.fail(error, |_| {});
                OperationStatus::Failed
            }
        }
    }

    /// Not guarded: issue creation never touches the session.
    pub async fn create_issue_for_finding(&self, repo_id: RepoId) -> OperationStatus {
        let repo_name = self.with_session(|session| {
            session
                .findings
                .iter()
                .find(|finding| finding.id == repo_id)
                .map(|finding| finding.name.clone())
        });

        match self.gateway.create_issue(repo_id).await {
            Ok(issue) => {
                info!(repo_id = repo_id.0, url = %issue.url, "issue created");
                let label = repo_name.unwrap_or_else(|| format!("repository {repo_id}"));
                self.notifier
                    .show_success(&format!("Issue created for {label}."), Some(&issue.url));
                OperationStatus::Completed
            }
            Err(error) => {
                warn!(repo_id = repo_id.0, %error, "issue creation failed");
                self.notifier.show_error(&error.user_message());
                OperationStatus::Failed
            }
        }
    }

    /// Restores the persisted search form and selected user. Called once at start-up;
    /// a failure is notified but never aborts start-up.
    pub async fn hydrate_from_persisted_session(&self) -> OperationStatus {
        let _guard = match self.try_begin(BusyKind::Resolving, |_| {}) {
            Ok(guard) => guard,
            Err(busy) => return Self::rejected("hydrate_from_persisted_session", busy),
        };

        let persisted = self.store.load().await;
        if let Some(form) = persisted.search_form {
            self.lock_state().form = form;
        }
        let Some(login) = persisted.selected_user else {
            debug!("no persisted user; starting idle");
            return OperationStatus::Completed;
        };

        info!(login = %login, "resuming persisted session");
        self.with_session(|session| {
            session.selected_user = Some(login.clone());
            session.phase = WorkflowPhase::ResolvingUser;
        });

        match self.gateway.fetch_findings_for_user(&login).await {
            Ok(findings) => {
                self.show_refreshed(&login, findings);
                OperationStatus::Completed
            }
            Err(error) => {
                // The persisted key stays so a later refresh can retry.
                self.fail(error, |session| {
                    session.phase = WorkflowPhase::UsersShown;
                    session.candidate_users.clear();
                    session.selected_user = None;
                });
                OperationStatus::Failed
            }
        }
    }

    fn show_refreshed(&self, login: &str, findings: Vec<RepoFinding>) {
        let count = findings.len();
        info!(login, findings = count, "findings loaded");
        self.with_session(|session| {
            session.selected_user = Some(login.to_string());
            session.findings = findings;
            session.phase = WorkflowPhase::ResultsShown;
        });
        self.notifier.show_success(
            &format!("Loaded {count} {} for {login}.", plural(count, "finding")),
            None,
        );
    }

    /// Moves to `Failed`, applies `adjust`, then records and notifies `error`.
    fn fail(&self, error: NetworkError, adjust: impl FnOnce(&mut SearchSession)) {
        self.with_session(|session| {
            session.phase = WorkflowPhase::Failed;
            adjust(session);
        });
        self.report(&error);
    }

    /// Records and notifies `error` without touching the phase.
    fn report(&self, error: &NetworkError) {
        warn!(operation = %error.operation(), %error, "scan service call failed");
        self.report_message(error.operation(), error.user_message());
    }

    fn report_message(&self, operation: GatewayOperation, message: String) {
        self.notifier.show_error(&message);
        self.with_session(|session| session.last_error = Some(ErrorInfo { operation, message }));
    }

    /// One guarded operation at a time, whatever its kind: a selection is
    /// rejected while a user or repository search is still in flight, and
    /// vice versa, so a late search result can never clear a fresh selection.
    fn try_begin(
        &self,
        kind: BusyKind,
        prepare: impl FnOnce(&mut SearchSession),
    ) -> Result<BusyGuard<'_>, BusyKind> {
        let mut state = self.lock_state();
        if state.searching {
            return Err(BusyKind::Searching);
        }
        if state.resolving {
            return Err(BusyKind::Resolving);
        }
        match kind {
            BusyKind::Searching => state.searching = true,
            BusyKind::Resolving => state.resolving = true,
        }
        prepare(&mut state.session);
        Ok(BusyGuard {
            state: &self.state,
            kind,
        })
    }

    fn rejected(operation: &'static str, busy: BusyKind) -> OperationStatus {
        debug!(operation, ?busy, "rejected while another operation is in flight");
        OperationStatus::Rejected(busy)
    }

    fn with_session<R>(&self, f: impl FnOnce(&mut SearchSession) -> R) -> R {
        f(&mut self.lock_state().session)
    }

    fn lock_state(&self) -> MutexGuard<'_, ControllerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        noun.to_string()
    } else {
        format!("{noun}s")
    }
}

fn found_repos_message(repo_count: usize, login: &str) -> String {
    format!(
        "Found {repo_count} {} for {login}. Please wait a few seconds to see results.",
        plural(repo_count, "repo")
    )
}

#[cfg(test)]
#[path = "tests/workflow_tests.rs"]
mod tests;
