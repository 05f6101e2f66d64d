//! Typed view over the two persisted session keys.
//!
//! Reads never fail: a missing, unreadable or malformed value is reported as
//! absent and logged. Writes go straight through to [`Storage`].

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use shared::domain::SearchFormParams;
use tracing::{debug, warn};

use crate::Storage;

pub const DEFAULT_SCOPE: &str = "search-user";
pub const SELECTED_USER_KEY: &str = "selectedUser";
pub const SEARCH_FORM_PARAMS_KEY: &str = "searchFormParams";

/// Values restored when the process starts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersistedSession {
    pub selected_user: Option<String>,
    pub search_form: Option<SearchFormParams>,
}

/// On-disk shape of [`SearchFormParams`]; numbers are kept as decimal text.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredSearchForm {
    query: String,
    sort_field: String,
    sort_order: String,
    start_page: String,
    pages_to_process: String,
}

impl From<&SearchFormParams> for StoredSearchForm {
    fn from(params: &SearchFormParams) -> Self {
        Self {
            query: params.query.clone(),
            sort_field: params.sort_field.clone(),
            sort_order: params.sort_order.as_str().to_string(),
            start_page: params.start_page.to_string(),
            pages_to_process: params.pages_to_process.to_string(),
        }
    }
}

impl StoredSearchForm {
    fn into_params(self) -> Option<SearchFormParams> {
        Some(SearchFormParams {
            query: self.query,
            sort_field: self.sort_field,
            sort_order: self.sort_order.parse().ok()?,
            start_page: self.start_page.trim().parse().ok()?,
            pages_to_process: self.pages_to_process.trim().parse().ok()?,
        })
    }
}

#[derive(Clone)]
pub struct SessionStore {
    storage: Storage,
    scope: String,
}

impl SessionStore {
    pub fn new(storage: Storage) -> Self {
        Self::with_scope(storage, DEFAULT_SCOPE)
    }

    pub fn with_scope(storage: Storage, scope: impl Into<String>) -> Self {
        Self {
            storage,
            scope: scope.into(),
        }
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// Reads both keys. Intended to be called once at start-up.
    pub async fn load(&self) -> PersistedSession {
        PersistedSession {
            selected_user: self.selected_user().await,
            search_form: self.search_form().await,
        }
    }

    pub async fn selected_user(&self) -> Option<String> {
        let raw = self.read_raw(SELECTED_USER_KEY).await?;
        match serde_json::from_str::<String>(&raw) {
            Ok(login) if !login.trim().is_empty() => Some(login),
            Ok(_) => None,
            Err(error) => {
                warn!(scope = %self.scope, key = SELECTED_USER_KEY, %error, "ignoring malformed session value");
                None
            }
        }
    }

    pub async fn save_selected_user(&self, login: &str) -> Result<()> {
        let encoded = serde_json::to_string(login)?;
        self.storage
            .put_value(&self.scope, SELECTED_USER_KEY, &encoded)
            .await
            .context("failed to persist selected user")?;
        debug!(scope = %self.scope, login, "persisted selected user");
        Ok(())
    }

    pub async fn clear_selected_user(&self) -> Result<()> {
        let removed = self
            .storage
            .delete_value(&self.scope, SELECTED_USER_KEY)
            .await
            .context("failed to clear selected user")?;
        debug!(scope = %self.scope, removed, "cleared selected user");
        Ok(())
    }

    pub async fn search_form(&self) -> Option<SearchFormParams> {
        let raw = self.read_raw(SEARCH_FORM_PARAMS_KEY).await?;
        let parsed = serde_json::from_str::<StoredSearchForm>(&raw)
            .ok()
            .and_then(StoredSearchForm::into_params);
        if parsed.is_none() {
            warn!(scope = %self.scope, key = SEARCH_FORM_PARAMS_KEY, "ignoring malformed session value");
        }
        parsed
    }

    pub async fn save_search_form(&self, params: &SearchFormParams) -> Result<()> {
        let encoded = serde_json::to_string(&StoredSearchForm::from(params))?;
        self.storage
            .put_value(&self.scope, SEARCH_FORM_PARAMS_KEY, &encoded)
            .await
            .context("failed to persist search form parameters")?;
        Ok(())
    }

    async fn read_raw(&self, key: &str) -> Option<String> {
        match self.storage.get_value(&self.scope, key).await {
            Ok(value) => value,
            Err(error) => {
                warn!(scope = %self.scope, key, error = %format!("{error:#}"), "session value unreadable; treating as absent");
                None
            }
        }
    }
}
