use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

use super::*;
use crate::view::{findings_panel, users_panel, FindingsPanel, TableQuery, UsersPanel};
use async_trait::async_trait;
use serde_json::Map;
use shared::{
    domain::{RepoScanState, RepositoryRecord, SortOrder},
    protocol::CreatedIssue,
};
use storage::Storage;
use tokio::sync::Notify;

type Scripted<T> = Mutex<VecDeque<Result<T, NetworkError>>>;

#[derive(Default)]
struct Gate {
    entered: Notify,
    release: Notify,
}

#[derive(Default)]
struct ScriptedGateway {
    users: Scripted<Vec<GithubUserSummary>>,
    searches: Scripted<Vec<RepositoryRecord>>,
    repos: Scripted<Vec<RepositoryRecord>>,
    persist: Scripted<()>,
    findings: Scripted<Vec<RepoFinding>>,
    issues: Scripted<CreatedIssue>,
    calls: Mutex<Vec<String>>,
    repos_gate: Option<Gate>,
    users_gate: Option<Gate>,
}

impl ScriptedGateway {
    fn gated() -> Self {
        Self {
            repos_gate: Some(Gate::default()),
            ..Self::default()
        }
    }

    fn gated_users() -> Self {
        Self {
            users_gate: Some(Gate::default()),
            ..Self::default()
        }
    }

    fn gate(&self) -> &Gate {
        self.repos_gate.as_ref().expect("gated gateway")
    }

    fn users_gate(&self) -> &Gate {
        self.users_gate.as_ref().expect("gated user search")
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn next<T: Default>(queue: &Scripted<T>) -> Result<T, NetworkError> {
        queue.lock().unwrap().pop_front().unwrap_or_else(|| Ok(T::default()))
    }
}

#[async_trait]
impl ApiGateway for ScriptedGateway {
    async fn find_users(&self, username: &str) -> Result<Vec<GithubUserSummary>, NetworkError> {
        self.record(format!("find_users:{username}"));
        if let Some(gate) = &self.users_gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }
        Self::next(&self.users)
    }

    async fn search_repos(
        &self,
        params: &SearchFormParams,
    ) -> Result<Vec<RepositoryRecord>, NetworkError> {
        self.record(format!("search_repos:{}", params.query));
        Self::next(&self.searches)
    }

    async fn list_repos_for_user(
        &self,
        login: &str,
    ) -> Result<Vec<RepositoryRecord>, NetworkError> {
        self.record(format!("list_repos:{login}"));
        if let Some(gate) = &self.repos_gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }
        Self::next(&self.repos)
    }

    async fn persist_repos(&self, repos: &[RepositoryRecord]) -> Result<(), NetworkError> {
        self.record(format!("persist:{}", repos.len()));
        Self::next(&self.persist)
    }

    async fn fetch_findings_for_user(
        &self,
        login: &str,
    ) -> Result<Vec<RepoFinding>, NetworkError> {
        self.record(format!("fetch_findings:{login}"));
        Self::next(&self.findings)
    }

    async fn create_issue(&self, repo_id: RepoId) -> Result<CreatedIssue, NetworkError> {
        self.record(format!("create_issue:{repo_id}"));
        self.issues
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(CreatedIssue { url: String::new() }))
    }
}

#[derive(Default)]
struct RecordingSink {
    errors: Mutex<Vec<String>>,
    successes: Mutex<Vec<(String, Option<String>)>>,
}

impl RecordingSink {
    fn errors(&self) -> Vec<String> {
        self.errors.lock().unwrap().clone()
    }

    fn successes(&self) -> Vec<(String, Option<String>)> {
        self.successes.lock().unwrap().clone()
    }
}

impl NotificationSink for RecordingSink {
    fn show_error(&self, message: &str) {
        self.errors.lock().unwrap().push(message.to_string());
    }

    fn show_success(&self, message: &str, link: Option<&str>) {
        self.successes
            .lock()
            .unwrap()
            .push((message.to_string(), link.map(str::to_string)));
    }
}

struct Harness {
    controller: Arc<WorkflowController>,
    gateway: Arc<ScriptedGateway>,
    sink: Arc<RecordingSink>,
    store: SessionStore,
}

async fn memory_store() -> SessionStore {
    SessionStore::new(Storage::new("sqlite::memory:").await.expect("memory storage"))
}

fn harness_with(gateway: ScriptedGateway, store: SessionStore) -> Harness {
    let gateway = Arc::new(gateway);
    let sink = Arc::new(RecordingSink::default());
    let controller = Arc::new(WorkflowController::new(
        gateway.clone(),
        store.clone(),
        sink.clone(),
    ));
    Harness {
        controller,
        gateway,
        sink,
        store,
    }
}

async fn harness(gateway: ScriptedGateway) -> Harness {
    harness_with(gateway, memory_store().await)
}

fn user(login: &str) -> GithubUserSummary {
    GithubUserSummary {
        login: login.to_string(),
        avatar_url: format!("https://avatars/{login}"),
        display_name: None,
    }
}

fn repo(name: &str) -> RepositoryRecord {
    RepositoryRecord {
        name: name.to_string(),
        author: "ada".into(),
        language: "Rust".into(),
        stars: 1,
        forks: 0,
        gh_url: None,
        clone_url: None,
        last_push: None,
        extra: Map::new(),
    }
}

fn finding(id: i64, name: &str) -> RepoFinding {
    RepoFinding {
        id: RepoId(id),
        name: name.to_string(),
        author: "ada".into(),
        language: "Rust".into(),
        stars: 0,
        forks: 0,
        state: RepoScanState::Done,
        links: Vec::new(),
        error_message: None,
        gh_url: None,
    }
}

fn server_error(operation: GatewayOperation, message: &str) -> NetworkError {
    NetworkError::Status {
        operation,
        status: 500,
        message: Some(message.to_string()),
    }
}

#[tokio::test]
async fn empty_user_search_shows_no_users_found() {
    let h = harness(ScriptedGateway::default()).await;
    h.gateway.users.lock().unwrap().push_back(Ok(Vec::new()));

    assert_eq!(h.controller.start_user_search("ada").await, OperationStatus::Completed);

    let session = h.controller.session();
    assert_eq!(session.phase, WorkflowPhase::UsersShown);
    assert!(session.candidate_users.is_empty());
    assert!(h.sink.errors().is_empty());
    assert_eq!(
        users_panel(&session, &TableQuery::default()),
        UsersPanel::NoUsersFound
    );
}

#[tokio::test]
async fn user_search_lists_candidates() {
    let h = harness(ScriptedGateway::default()).await;
    h.gateway
        .users
        .lock()
        .unwrap()
        .push_back(Ok(vec![user("ada"), user("ada-bot")]));

    assert_eq!(h.controller.start_user_search("  ada ").await, OperationStatus::Completed);

    let session = h.controller.session();
    assert_eq!(session.username.as_deref(), Some("ada"));
    assert_eq!(session.candidate_users.len(), 2);
    assert_eq!(h.gateway.calls(), vec!["find_users:ada"]);
    match users_panel(&session, &TableQuery::default()) {
        UsersPanel::Users(page) => assert_eq!(page.rows.len(), 2),
        other => panic!("unexpected panel {other:?}"),
    }
}

#[tokio::test]
async fn user_search_failure_is_recorded_and_notified() {
    let h = harness(ScriptedGateway::default()).await;
    h.gateway
        .users
        .lock()
        .unwrap()
        .push_back(Err(server_error(GatewayOperation::FindUsers, "GitHub rate limit")));

    assert_eq!(h.controller.start_user_search("ada").await, OperationStatus::Failed);

    let session = h.controller.session();
    assert_eq!(session.phase, WorkflowPhase::Failed);
    assert!(session.candidate_users.is_empty());
    assert_eq!(
        session.last_error,
        Some(ErrorInfo {
            operation: GatewayOperation::FindUsers,
            message: "GitHub rate limit".into(),
        })
    );
    assert_eq!(h.sink.errors(), vec!["GitHub rate limit"]);
    assert!(!h.controller.is_busy());
}

#[tokio::test]
async fn select_user_survives_persist_failure() {
    let h = harness(ScriptedGateway::default()).await;
    h.gateway
        .repos
        .lock()
        .unwrap()
        .push_back(Ok(vec![repo("a"), repo("b"), repo("c")]));
    h.gateway.persist.lock().unwrap().push_back(Err(NetworkError::Status {
        operation: GatewayOperation::PersistRepos,
        status: 503,
        message: None,
    }));
    h.gateway.findings.lock().unwrap().push_back(Ok(Vec::new()));

    assert_eq!(h.controller.select_user("ada").await, OperationStatus::Completed);

    assert_eq!(
        h.gateway.calls(),
        vec!["list_repos:ada", "persist:3", "fetch_findings:ada"]
    );
    let session = h.controller.session();
    assert_eq!(session.phase, WorkflowPhase::ResultsShown);
    assert_eq!(session.repo_count, Some(3));
    assert_eq!(
        h.sink.errors(),
        vec!["The scan service rejected saving repositories (HTTP 503). Please retry."]
    );
    assert_eq!(
        h.sink.successes(),
        vec![(
            "Found 3 repos for ada. Please wait a few seconds to see results.".to_string(),
            None
        )]
    );
    assert_eq!(
        findings_panel(&session, &TableQuery::default()),
        FindingsPanel::NoFindings {
            login: "ada".into()
        }
    );
    assert_eq!(h.store.selected_user().await.as_deref(), Some("ada"));
}

#[tokio::test]
async fn user_without_repositories_is_a_success() {
    let h = harness(ScriptedGateway::default()).await;

    assert_eq!(h.controller.select_user("ada").await, OperationStatus::Completed);

    let session = h.controller.session();
    assert_eq!(session.repo_count, Some(0));
    assert!(h.sink.errors().is_empty());
    assert_eq!(
        h.sink.successes()[0].0,
        "Found 0 repos for ada. Please wait a few seconds to see results."
    );
    assert_eq!(
        findings_panel(&session, &TableQuery::default()),
        FindingsPanel::NoRepos {
            login: "ada".into()
        }
    );
}

#[tokio::test]
async fn listing_failure_stops_before_persist_and_keeps_selection() {
    let h = harness(ScriptedGateway::default()).await;
    h.gateway
        .repos
        .lock()
        .unwrap()
        .push_back(Err(server_error(GatewayOperation::ListRepos, "user not found")));

    assert_eq!(h.controller.select_user("ada").await, OperationStatus::Failed);

    assert_eq!(h.gateway.calls(), vec!["list_repos:ada"]);
    let session = h.controller.session();
    assert_eq!(session.phase, WorkflowPhase::Failed);
    assert_eq!(session.selected_user.as_deref(), Some("ada"));
    assert!(session.findings.is_empty());
    assert_eq!(h.store.selected_user().await, None);
    assert!(h.sink.successes().is_empty());
}

#[tokio::test]
async fn findings_failure_after_select_clears_findings() {
    let h = harness(ScriptedGateway::default()).await;
    h.gateway.findings.lock().unwrap().extend([
        Ok(vec![finding(1, "engine")]),
        Err(server_error(GatewayOperation::FetchFindings, "db down")),
    ]);
    assert_eq!(h.controller.select_user("ada").await, OperationStatus::Completed);

    assert_eq!(h.controller.select_user("ada").await, OperationStatus::Failed);

    let session = h.controller.session();
    assert_eq!(session.phase, WorkflowPhase::Failed);
    assert!(session.findings.is_empty());
    assert_eq!(session.last_error.map(|e| e.message).as_deref(), Some("db down"));
}

#[tokio::test]
async fn failed_refresh_keeps_last_snapshot() {
    let h = harness(ScriptedGateway::default()).await;
    let five: Vec<_> = (1..=5).map(|id| finding(id, &format!("repo-{id}"))).collect();
    h.gateway.findings.lock().unwrap().extend([
        Ok(five),
        Err(NetworkError::Transport {
            operation: GatewayOperation::FetchFindings,
            detail: "connection reset".into(),
        }),
    ]);
    assert_eq!(h.controller.select_user("ada").await, OperationStatus::Completed);

    assert_eq!(h.controller.refresh_findings().await, OperationStatus::Failed);

    let session = h.controller.session();
    assert_eq!(session.findings.len(), 5);
    assert_eq!(session.phase, WorkflowPhase::Failed);
    assert_eq!(
        h.sink.errors(),
        vec!["Could not reach the scan service while loading link findings. Please retry."]
    );
    match findings_panel(&session, &TableQuery::default()) {
        FindingsPanel::Rows(page) => assert_eq!(page.matched, 5),
        other => panic!("unexpected panel {other:?}"),
    }
}

#[tokio::test]
async fn refresh_replaces_findings_wholesale() {
    let h = harness(ScriptedGateway::default()).await;
    h.gateway.findings.lock().unwrap().extend([
        Ok(vec![finding(1, "engine"), finding(2, "docs")]),
        Ok(vec![finding(3, "website")]),
    ]);
    h.controller.select_user("ada").await;

    assert_eq!(h.controller.refresh_findings().await, OperationStatus::Completed);

    let session = h.controller.session();
    assert_eq!(session.phase, WorkflowPhase::ResultsShown);
    assert_eq!(session.findings, vec![finding(3, "website")]);
    assert_eq!(
        h.sink.successes().last().map(|(message, _)| message.as_str()),
        Some("Loaded 1 finding for ada.")
    );
    assert_eq!(
        h.gateway.calls(),
        vec!["list_repos:ada", "persist:0", "fetch_findings:ada", "fetch_findings:ada"]
    );
}

#[tokio::test]
async fn refresh_without_any_selected_user_makes_no_call() {
    let h = harness(ScriptedGateway::default()).await;

    assert_eq!(h.controller.refresh_findings().await, OperationStatus::Failed);

    assert!(h.gateway.calls().is_empty());
    assert_eq!(h.sink.errors(), vec![NO_SELECTED_USER]);
    assert_eq!(h.controller.phase(), WorkflowPhase::Idle);
}

#[tokio::test]
async fn refresh_falls_back_to_persisted_user() {
    let store = memory_store().await;
    store.save_selected_user("grace").await.expect("seed user");
    let h = harness_with(ScriptedGateway::default(), store);

    assert_eq!(h.controller.refresh_findings().await, OperationStatus::Completed);

    assert_eq!(h.gateway.calls(), vec!["fetch_findings:grace"]);
    assert_eq!(h.controller.session().selected_user.as_deref(), Some("grace"));
}

#[tokio::test]
async fn hydrate_resumes_persisted_user_without_search() {
    let store = memory_store().await;
    store.save_selected_user("grace").await.expect("seed user");
    let form = SearchFormParams {
        query: "language:rust".into(),
        sort_field: "stars".into(),
        sort_order: SortOrder::Asc,
        start_page: 2,
        pages_to_process: 3,
    };
    store.save_search_form(&form).await.expect("seed form");
    let h = harness_with(ScriptedGateway::default(), store);
    h.gateway
        .findings
        .lock()
        .unwrap()
        .push_back(Ok(vec![finding(7, "compiler")]));

    assert_eq!(
        h.controller.hydrate_from_persisted_session().await,
        OperationStatus::Completed
    );

    assert_eq!(h.gateway.calls(), vec!["fetch_findings:grace"]);
    let session = h.controller.session();
    assert_eq!(session.phase, WorkflowPhase::ResultsShown);
    assert_eq!(session.selected_user.as_deref(), Some("grace"));
    assert_eq!(session.findings.len(), 1);
    assert_eq!(h.controller.search_form(), form);
}

#[tokio::test]
async fn hydrate_without_persisted_user_stays_idle() {
    let h = harness(ScriptedGateway::default()).await;

    assert_eq!(
        h.controller.hydrate_from_persisted_session().await,
        OperationStatus::Completed
    );

    assert!(h.gateway.calls().is_empty());
    assert_eq!(h.controller.session(), SearchSession::default());
    assert_eq!(h.controller.search_form(), SearchFormParams::default());
}

#[tokio::test]
async fn hydrate_failure_falls_back_and_refresh_can_retry() {
    let store = memory_store().await;
    store.save_selected_user("grace").await.expect("seed user");
    let h = harness_with(ScriptedGateway::default(), store);
    h.gateway.findings.lock().unwrap().extend([
        Err(server_error(GatewayOperation::FetchFindings, "db down")),
        Ok(vec![finding(1, "engine")]),
    ]);

    assert_eq!(
        h.controller.hydrate_from_persisted_session().await,
        OperationStatus::Failed
    );

    let session = h.controller.session();
    assert_eq!(session.phase, WorkflowPhase::UsersShown);
    assert!(session.candidate_users.is_empty());
    assert_eq!(session.selected_user, None);
    assert_eq!(h.sink.errors(), vec!["db down"]);
    assert_eq!(h.store.selected_user().await.as_deref(), Some("grace"));

    assert_eq!(h.controller.refresh_findings().await, OperationStatus::Completed);
    assert_eq!(h.controller.phase(), WorkflowPhase::ResultsShown);
}

#[tokio::test]
async fn new_search_forgets_previous_selection() {
    let h = harness(ScriptedGateway::default()).await;
    h.gateway
        .findings
        .lock()
        .unwrap()
        .push_back(Ok(vec![finding(1, "engine")]));
    h.controller.select_user("ada").await;
    assert_eq!(h.store.selected_user().await.as_deref(), Some("ada"));

    h.controller.start_user_search("grace").await;

    let session = h.controller.session();
    assert_eq!(session.selected_user, None);
    assert!(session.findings.is_empty());
    assert_eq!(session.repo_count, None);
    assert_eq!(h.store.selected_user().await, None);
}

#[tokio::test]
async fn issue_link_is_passed_as_structured_payload() {
    let h = harness(ScriptedGateway::default()).await;
    h.gateway.issues.lock().unwrap().push_back(Ok(CreatedIssue {
        url: "https://github.com/x/y/issues/1".into(),
    }));

    assert_eq!(
        h.controller.create_issue_for_finding(RepoId(42)).await,
        OperationStatus::Completed
    );

    assert_eq!(h.gateway.calls(), vec!["create_issue:42"]);
    let (message, link) = h.sink.successes().pop().expect("success toast");
    assert_eq!(link.as_deref(), Some("https://github.com/x/y/issues/1"));
    assert!(!message.contains("https://"));
    assert_eq!(message, "Issue created for repository 42.");
    assert_eq!(h.controller.phase(), WorkflowPhase::Idle);
}

#[tokio::test]
async fn issue_failure_leaves_findings_and_phase_alone() {
    let h = harness(ScriptedGateway::default()).await;
    h.gateway
        .findings
        .lock()
        .unwrap()
        .push_back(Ok(vec![finding(42, "engine")]));
    h.gateway
        .issues
        .lock()
        .unwrap()
        .push_back(Err(server_error(GatewayOperation::CreateIssue, "Repo 42 not found")));
    h.controller.select_user("ada").await;
    let before = h.controller.session();

    assert_eq!(
        h.controller.create_issue_for_finding(RepoId(42)).await,
        OperationStatus::Failed
    );

    assert_eq!(h.controller.session(), before);
    assert_eq!(h.sink.errors(), vec!["Repo 42 not found"]);
}

#[tokio::test]
async fn issue_success_names_known_finding() {
    let h = harness(ScriptedGateway::default()).await;
    h.gateway
        .findings
        .lock()
        .unwrap()
        .push_back(Ok(vec![finding(42, "engine")]));
    h.controller.select_user("ada").await;

    h.controller.create_issue_for_finding(RepoId(42)).await;

    assert_eq!(
        h.sink.successes().last().map(|(message, _)| message.as_str()),
        Some("Issue created for engine.")
    );
}

#[tokio::test]
async fn concurrent_calls_are_rejected_without_side_effects() {
    let h = harness(ScriptedGateway::gated()).await;
    h.gateway
        .repos
        .lock()
        .unwrap()
        .push_back(Ok(vec![repo("engine")]));

    let first = tokio::spawn({
        let controller = h.controller.clone();
        async move { controller.select_user("ada").await }
    });
    h.gateway.gate().entered.notified().await;

    let before = h.controller.session();
    assert_eq!(before.phase, WorkflowPhase::ResolvingUser);
    assert_eq!(
        h.controller.select_user("grace").await,
        OperationStatus::Rejected(BusyKind::Resolving)
    );
    assert_eq!(
        h.controller.start_user_search("grace").await,
        OperationStatus::Rejected(BusyKind::Resolving)
    );
    assert_eq!(
        h.controller.refresh_findings().await,
        OperationStatus::Rejected(BusyKind::Resolving)
    );
    assert_eq!(h.controller.session(), before);

    h.gateway.gate().release.notify_one();
    assert_eq!(first.await.expect("join"), OperationStatus::Completed);
    assert!(!h.controller.is_busy());
    assert_eq!(
        h.gateway.calls(),
        vec!["list_repos:ada", "persist:1", "fetch_findings:ada"]
    );
}

#[tokio::test]
async fn cancelled_operation_releases_its_guard() {
    let h = harness(ScriptedGateway::gated()).await;

    let pending = tokio::spawn({
        let controller = h.controller.clone();
        async move { controller.select_user("ada").await }
    });
    h.gateway.gate().entered.notified().await;
    assert!(h.controller.is_busy());

    pending.abort();
    assert!(pending.await.expect_err("aborted").is_cancelled());

    assert!(!h.controller.is_busy());
    h.gateway.users.lock().unwrap().push_back(Ok(vec![user("grace")]));
    assert_eq!(
        h.controller.start_user_search("grace").await,
        OperationStatus::Completed
    );
}

#[tokio::test]
async fn search_form_is_validated_and_persisted() {
    let h = harness(ScriptedGateway::default()).await;

    let invalid = SearchFormParams {
        pages_to_process: 11,
        query: "rust".into(),
        ..SearchFormParams::default()
    };
    let error = h
        .controller
        .update_search_form(invalid)
        .await
        .expect_err("too many pages");
    assert_eq!(error.field, "pagesToProcess");
    assert_eq!(h.controller.search_form(), SearchFormParams::default());
    assert_eq!(h.store.search_form().await, None);

    let valid = SearchFormParams {
        query: "rust".into(),
        ..SearchFormParams::default()
    };
    h.controller
        .update_search_form(valid.clone())
        .await
        .expect("valid form");
    assert_eq!(h.controller.search_form(), valid);
    assert_eq!(h.store.search_form().await, Some(valid));
}

#[tokio::test]
async fn select_user_is_rejected_while_user_search_runs() {
    let h = harness(ScriptedGateway::gated_users()).await;
    h.gateway.users.lock().unwrap().push_back(Ok(vec![user("ada")]));
    h.controller
        .update_search_form(repo_form("rust"))
        .await
        .expect("valid form");

    let search = tokio::spawn({
        let controller = h.controller.clone();
        async move { controller.start_user_search("ada").await }
    });
    h.gateway.users_gate().entered.notified().await;

    assert_eq!(
        h.controller.select_user("ada").await,
        OperationStatus::Rejected(BusyKind::Searching)
    );
    assert_eq!(
        h.controller.search_repositories().await,
        OperationStatus::Rejected(BusyKind::Searching)
    );
    assert_eq!(h.controller.phase(), WorkflowPhase::SearchingUser);

    h.gateway.users_gate().release.notify_one();
    assert_eq!(search.await.expect("join"), OperationStatus::Completed);
    assert_eq!(h.gateway.calls(), vec!["find_users:ada"]);
    assert_eq!(h.controller.session().candidate_users, vec![user("ada")]);
}

fn repo_form(query: &str) -> SearchFormParams {
    SearchFormParams {
        query: query.to_string(),
        sort_field: "stars".into(),
        ..SearchFormParams::default()
    }
}

#[tokio::test]
async fn repository_search_with_invalid_form_makes_no_call() {
    let h = harness(ScriptedGateway::default()).await;

    assert_eq!(h.controller.search_repositories().await, OperationStatus::Failed);

    assert!(h.gateway.calls().is_empty());
    assert_eq!(h.sink.errors(), vec!["Query is required"]);
    let session = h.controller.session();
    assert_eq!(session.repo_search, None);
    assert_eq!(session.phase, WorkflowPhase::Idle);
    assert_eq!(
        session.last_error.map(|e| e.operation),
        Some(GatewayOperation::SearchRepos)
    );
}

#[tokio::test]
async fn repository_search_runs_persisted_form_and_keeps_user_results() {
    let store = memory_store().await;
    store
        .save_search_form(&repo_form(" topic:cli "))
        .await
        .expect("seed form");
    let h = harness_with(ScriptedGateway::default(), store);
    h.gateway
        .findings
        .lock()
        .unwrap()
        .push_back(Ok(vec![finding(1, "engine")]));
    h.gateway
        .searches
        .lock()
        .unwrap()
        .push_back(Ok(vec![repo("cli"), repo("tui")]));
    h.controller.select_user("ada").await;

    assert_eq!(h.controller.restore_search_form().await, repo_form(" topic:cli "));
    assert_eq!(h.controller.search_repositories().await, OperationStatus::Completed);

    let session = h.controller.session();
    assert_eq!(
        session.repo_search,
        Some(RepoSearch {
            query: "topic:cli".into(),
            repos: vec![repo("cli"), repo("tui")],
        })
    );
    assert_eq!(session.phase, WorkflowPhase::ResultsShown);
    assert_eq!(session.findings.len(), 1);
    assert_eq!(
        h.sink.successes().last().map(|(message, _)| message.as_str()),
        Some("Found 2 repos matching 'topic:cli'.")
    );
    assert_eq!(h.gateway.calls().last().map(String::as_str), Some("search_repos: topic:cli "));
}

#[tokio::test]
async fn repository_search_failure_is_notified_without_failing_the_workflow() {
    let h = harness(ScriptedGateway::default()).await;
    h.controller
        .update_search_form(repo_form("rust"))
        .await
        .expect("valid form");
    h.gateway
        .searches
        .lock()
        .unwrap()
        .push_back(Err(server_error(GatewayOperation::SearchRepos, "GitHub rate limit")));

    assert_eq!(h.controller.search_repositories().await, OperationStatus::Failed);

    let session = h.controller.session();
    assert_eq!(session.phase, WorkflowPhase::Idle);
    assert_eq!(session.repo_search, None);
    assert_eq!(h.sink.errors(), vec!["GitHub rate limit"]);
    assert!(!h.controller.is_busy());
}

#[tokio::test]
async fn searched_repositories_are_saved_on_request() {
    let h = harness(ScriptedGateway::default()).await;

    assert_eq!(h.controller.save_repo_results().await, OperationStatus::Failed);
    assert!(h.gateway.calls().is_empty());
    assert_eq!(h.sink.errors(), vec![NO_REPO_RESULTS]);

    h.controller
        .update_search_form(repo_form("rust"))
        .await
        .expect("valid form");
    h.gateway
        .searches
        .lock()
        .unwrap()
        .push_back(Ok(vec![repo("cli"), repo("tui"), repo("web")]));
    h.controller.search_repositories().await;

    assert_eq!(h.controller.save_repo_results().await, OperationStatus::Completed);

    assert_eq!(h.gateway.calls(), vec!["search_repos:rust", "persist:3"]);
    assert_eq!(
        h.sink.successes().last().map(|(message, _)| message.as_str()),
        Some("3 repos saved.")
    );
}
