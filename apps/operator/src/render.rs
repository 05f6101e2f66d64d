//! Plain-text rendering of panels and toasts for the terminal.

use std::fmt::Write as _;

use client_core::{
    view::{FindingsPanel, ProjectedPage, RepoResultsPanel, UsersPanel},
    Toast, ToastKind,
};
use shared::domain::{RepoFinding, SearchFormParams};

pub fn users(panel: &UsersPanel) -> String {
    match panel {
        UsersPanel::NotSearched => String::new(),
        UsersPanel::Loading => "Searching users...\n".into(),
        UsersPanel::NoUsersFound => "No users found.\n".into(),
        UsersPanel::Users(page) => {
            let mut out = String::new();
            let _ = writeln!(out, "{:<24} NAME", "LOGIN");
            for user in &page.rows {
                let _ = writeln!(
                    out,
                    "{:<24} {}",
                    user.login,
                    user.display_name.as_deref().unwrap_or("-")
                );
            }
            push_footer(&mut out, page);
            out
        }
    }
}

pub fn repo_results(panel: &RepoResultsPanel) -> String {
    match panel {
        RepoResultsPanel::NotSearched => String::new(),
        RepoResultsPanel::NoRepos { query } => format!("No repositories found for '{query}'.\n"),
        RepoResultsPanel::NoMatches { filter_text } => {
            format!("No repositories match '{filter_text}'.\n")
        }
        RepoResultsPanel::Rows(page) => {
            let mut out = String::new();
            let _ = writeln!(
                out,
                "{:<28} {:<16} {:<12} {:>6} {:>6}",
                "NAME", "AUTHOR", "LANGUAGE", "STARS", "FORKS"
            );
            for repo in &page.rows {
                let _ = writeln!(
                    out,
                    "{:<28} {:<16} {:<12} {:>6} {:>6}",
                    repo.name, repo.author, repo.language, repo.stars, repo.forks
                );
            }
            push_footer(&mut out, page);
            out
        }
    }
}

pub fn findings(panel: &FindingsPanel) -> String {
    match panel {
        FindingsPanel::Hidden => String::new(),
        FindingsPanel::Loading { login } => format!("Loading findings for {login}...\n"),
        FindingsPanel::NoRepos { login } => format!("{login} has no repositories.\n"),
        FindingsPanel::NoFindings { login } => {
            format!("No findings for {login} yet. Refresh in a few seconds.\n")
        }
        FindingsPanel::NoMatches { filter_text } => {
            format!("No repositories match '{filter_text}'.\n")
        }
        FindingsPanel::Rows(page) => {
            let mut out = String::new();
            let _ = writeln!(
                out,
                "{:>8}  {:<28} {:<16} {:<12} {:>6} {:>6}  {:<10} {:>5}",
                "ID", "NAME", "AUTHOR", "LANGUAGE", "STARS", "FORKS", "STATE", "LINKS"
            );
            for finding in &page.rows {
                push_finding(&mut out, finding);
            }
            push_footer(&mut out, page);
            out
        }
    }
}

fn push_finding(out: &mut String, finding: &RepoFinding) {
    let _ = writeln!(
        out,
        "{:>8}  {:<28} {:<16} {:<12} {:>6} {:>6}  {:<10} {:>5}",
        finding.id.0,
        finding.name,
        finding.author,
        finding.language,
        finding.stars,
        finding.forks,
        finding.state.as_str(),
        finding.link_count()
    );
    if let Some(error) = &finding.error_message {
        let _ = writeln!(out, "          error: {error}");
    }
    for link in &finding.links {
        let marker = if link.expansion_failed() { " [not expanded]" } else { "" };
        let _ = writeln!(
            out,
            "          {} -> {}{marker}  ({}:{})",
            link.short_url, link.expanded_url, link.source_file, link.line_number
        );
    }
}

fn push_footer<T>(out: &mut String, page: &ProjectedPage<T>) {
    let _ = writeln!(
        out,
        "page {}/{}, {} matching of {} total, {} per page",
        page.page + 1,
        page.page_count().max(1),
        page.matched,
        page.total,
        page.rows_per_page
    );
}

pub fn toasts(toasts: &[Toast]) -> String {
    let mut out = String::new();
    for toast in toasts {
        let label = match toast.kind {
            ToastKind::Error => "error",
            ToastKind::Success => "ok",
        };
        let _ = writeln!(out, "[{label}] {}", toast.message);
        if let Some(link) = &toast.link {
            let _ = writeln!(out, "       {link}");
        }
    }
    out
}

pub fn search_form(params: &SearchFormParams) -> String {
    format!(
        "query={:?} sort_field={:?} sort_order={} start_page={} pages_to_process={}\n",
        params.query,
        params.sort_field,
        params.sort_order.as_str(),
        params.start_page,
        params.pages_to_process
    )
}

#[cfg(test)]
#[path = "tests/render_tests.rs"]
mod tests;
