use std::{path::PathBuf, process::ExitCode, str::FromStr, sync::Arc};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use client_core::{
    projector::{FindingKey, RepoKey, SortDirection, UserKey},
    view::{findings_panel, repo_results_panel, users_panel, TableQuery},
    HttpApiGateway, OperationStatus, ToastBoard, WorkflowController,
};
use shared::{
    domain::{RepoId, SearchFormParams, SortOrder},
    error::ValidationError,
};
use storage::{SessionStore, Storage};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod config;
mod render;

use config::{load_settings, DEFAULT_CONFIG_FILE};

#[derive(Parser, Debug)]
#[command(about = "Operator console for the goo.gl link scan service")]
struct Cli {
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Search GitHub users by name.
    Search {
        username: String,
        #[command(flatten)]
        table: TableArgs,
    },
    /// List, save and scan a user's repositories, then show the findings.
    Select {
        login: String,
        #[command(flatten)]
        table: TableArgs,
    },
    /// Reload findings for the remembered user.
    Refresh {
        #[command(flatten)]
        table: TableArgs,
    },
    /// Open a GitHub issue for one scanned repository.
    Issue { repo_id: i64 },
    /// Restore the remembered user and show their findings.
    Resume {
        #[command(flatten)]
        table: TableArgs,
    },
    /// Show or update the remembered repository search form.
    Form(FormArgs),
    /// Search GitHub repositories with the remembered form, optionally overriding it.
    Repos {
        #[command(flatten)]
        form: FormArgs,
        #[command(flatten)]
        table: TableArgs,
        /// Save the listed repositories to the scan service.
        #[arg(long)]
        save: bool,
    },
}

#[derive(Args, Debug, Clone)]
struct TableArgs {
    /// Column to sort by.
    #[arg(long)]
    order_by: Option<String>,
    #[arg(long, default_value = "asc")]
    order: String,
    #[arg(long, default_value = "")]
    filter: String,
    #[arg(long, default_value_t = 0)]
    page: usize,
    #[arg(long, default_value_t = 10)]
    rows: usize,
}

impl TableArgs {
    fn query<K>(&self, default_key: K) -> Result<TableQuery<K>, ValidationError>
    where
        K: FromStr<Err = ValidationError> + Copy + PartialEq,
    {
        let order_by = match &self.order_by {
            Some(raw) => raw.parse()?,
            None => default_key,
        };
        let mut query = TableQuery::new(order_by);
        query.direction = self.order.parse::<SortDirection>()?;
        query.set_rows_per_page(self.rows)?;
        query.set_filter(self.filter.clone());
        query.set_page(self.page);
        Ok(query)
    }
}

#[derive(Args, Debug, Clone)]
struct FormArgs {
    #[arg(long)]
    query: Option<String>,
    #[arg(long)]
    sort_field: Option<String>,
    #[arg(long)]
    sort_order: Option<String>,
    #[arg(long)]
    start_page: Option<i64>,
    #[arg(long)]
    pages_to_process: Option<i64>,
}

impl FormArgs {
    fn is_empty(&self) -> bool {
        self.query.is_none()
            && self.sort_field.is_none()
            && self.sort_order.is_none()
            && self.start_page.is_none()
            && self.pages_to_process.is_none()
    }

    fn apply(&self, mut params: SearchFormParams) -> Result<SearchFormParams, ValidationError> {
        if let Some(v) = &self.query {
            params.query = v.clone();
        }
        if let Some(v) = &self.sort_field {
            params.sort_field = v.clone();
        }
        if let Some(v) = &self.sort_order {
            params.sort_order = v.parse::<SortOrder>()?;
        }
        if let Some(v) = self.start_page {
            params.start_page = v;
        }
        if let Some(v) = self.pages_to_process {
            params.pages_to_process = v;
        }
        Ok(params)
    }
}

fn init_tracing(log_filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let settings = load_settings(&cli.config)?;
    init_tracing(&settings.log_filter);

    let http = reqwest::Client::builder()
        .timeout(settings.request_timeout())
        .build()
        .context("failed to build HTTP client")?;
    let gateway = Arc::new(HttpApiGateway::with_client(
        settings.api_base_url.clone(),
        http,
    ));
    let database_url = settings.session_database_url.clone();
    let storage = Storage::new(&database_url).await.map_err(|error| {
        error!(
            %database_url,
            error = %format!("{error:#}"),
            "failed to open session database; verify the directory is writable"
        );
        error
    })?;
    storage.health_check().await.map_err(|error| {
        error!(
            %database_url,
            error = %format!("{error:#}"),
            "session database opened but is not answering queries"
        );
        error
    })?;
    let store = SessionStore::new(storage);
    let toasts = Arc::new(ToastBoard::new(settings.toast_duration()));
    let controller = WorkflowController::new(gateway, store.clone(), toasts.clone());
    info!(api_base_url = %settings.api_base_url, "operator session ready");

    let status = match cli.command {
        Command::Search { username, table } => {
            let query = table.query(UserKey::Login)?;
            let status = controller.start_user_search(&username).await;
            print!("{}", render::users(&users_panel(&controller.session(), &query)));
            status
        }
        Command::Select { login, table } => {
            let query = table.query(FindingKey::Name)?;
            let status = controller.select_user(&login).await;
            print!("{}", render::findings(&findings_panel(&controller.session(), &query)));
            status
        }
        Command::Refresh { table } => {
            let query = table.query(FindingKey::Name)?;
            let status = controller.refresh_findings().await;
            print!("{}", render::findings(&findings_panel(&controller.session(), &query)));
            status
        }
        Command::Issue { repo_id } => controller.create_issue_for_finding(RepoId(repo_id)).await,
        Command::Resume { table } => {
            let query = table.query(FindingKey::Name)?;
            let status = controller.hydrate_from_persisted_session().await;
            let session = controller.session();
            print!("{}", render::users(&users_panel(&session, &TableQuery::new(UserKey::Login))));
            print!("{}", render::findings(&findings_panel(&session, &query)));
            status
        }
        Command::Repos { form, table, save } => {
            let query = table.query(RepoKey::Name)?;
            let current = controller.restore_search_form().await;
            if !form.is_empty() {
                controller.update_search_form(form.apply(current)?).await?;
            }
            let mut status = controller.search_repositories().await;
            print!("{}", render::repo_results(&repo_results_panel(&controller.session(), &query)));
            if save && status == OperationStatus::Completed {
                status = controller.save_repo_results().await;
            }
            status
        }
        Command::Form(args) => {
            let current = store.search_form().await.unwrap_or_default();
            if args.is_empty() {
                print!("{}", render::search_form(&current));
                OperationStatus::Completed
            } else {
                let updated = args.apply(current)?;
                controller.update_search_form(updated.clone()).await?;
                print!("{}", render::search_form(&updated));
                OperationStatus::Completed
            }
        }
    };

    eprint!("{}", render::toasts(&toasts.take_visible()));
    Ok(match status {
        OperationStatus::Completed => ExitCode::SUCCESS,
        OperationStatus::Failed | OperationStatus::Rejected(_) => ExitCode::FAILURE,
    })
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
