//! List state controller: pagination, sort and search state plus the
//! add/edit/delete round trips against a [`RecordsBackend`].

use std::{fmt, str::FromStr, sync::Arc};

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use shared::domain::{EditSession, ListQuery, Record, RecordId, DEFAULT_ID_FIELD};
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use crate::{
    transport::RecordsBackend,
    view::{DeleteConfirmation, FormView, GridRenderer, TableView},
};

/// What the visible table does when a refresh fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchFailurePolicy {
    #[default]
    #[serde(alias = "keep")]
    KeepPrevious,
    Clear,
}

impl FromStr for FetchFailurePolicy {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "keep" | "keep_previous" | "keep-previous" => Ok(FetchFailurePolicy::KeepPrevious),
            "clear" => Ok(FetchFailurePolicy::Clear),
            other => Err(anyhow!(
                "unknown fetch failure policy '{other}' (expected 'keep' or 'clear')"
            )),
        }
    }
}

impl fmt::Display for FetchFailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchFailurePolicy::KeepPrevious => f.write_str("keep"),
            FetchFailurePolicy::Clear => f.write_str("clear"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ControllerOptions {
    pub id_field: String,
    pub on_fetch_failure: FetchFailurePolicy,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            id_field: DEFAULT_ID_FIELD.to_string(),
            on_fetch_failure: FetchFailurePolicy::default(),
        }
    }
}

/// Copy of the controller state at one point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerSnapshot {
    pub query: ListQuery,
    pub total_pages: u32,
    pub columns: Vec<String>,
    pub edit_session: Option<EditSession>,
}

struct ControllerState {
    query: ListQuery,
    total_pages: u32,
    columns: Vec<String>,
    edit_session: Option<EditSession>,
    /// Bumped by every refresh; only the newest refresh may render.
    issued_generation: u64,
}

pub struct ListController {
    backend: Arc<dyn RecordsBackend>,
    renderer: Arc<dyn GridRenderer>,
    options: ControllerOptions,
    inner: Mutex<ControllerState>,
}

impl ListController {
    pub fn new(backend: Arc<dyn RecordsBackend>, renderer: Arc<dyn GridRenderer>) -> Self {
        Self::with_options(backend, renderer, ControllerOptions::default())
    }

    pub fn with_options(
        backend: Arc<dyn RecordsBackend>,
        renderer: Arc<dyn GridRenderer>,
        options: ControllerOptions,
    ) -> Self {
        Self {
            backend,
            renderer,
            options,
            inner: Mutex::new(ControllerState {
                query: ListQuery::default(),
                total_pages: 0,
                columns: Vec::new(),
                edit_session: None,
                issued_generation: 0,
            }),
        }
    }

    pub async fn snapshot(&self) -> ControllerSnapshot {
        let guard = self.inner.lock().await;
        ControllerSnapshot {
            query: guard.query.clone(),
            total_pages: guard.total_pages,
            columns: guard.columns.clone(),
            edit_session: guard.edit_session.clone(),
        }
    }

    pub async fn refresh(&self) -> Result<()> {
        let (generation, query) = {
            let mut guard = self.inner.lock().await;
            guard.issued_generation += 1;
            (guard.issued_generation, guard.query.clone())
        };

        let outcome = self.backend.list(&query).await;

        let mut guard = self.inner.lock().await;
        if generation < guard.issued_generation {
            debug!(
                generation,
                latest = guard.issued_generation,
                "grid: discarding stale refresh completion"
            );
            return Ok(());
        }

        match outcome {
            Ok(page) => {
                let set = page.into_record_set(&self.options.id_field);
                guard.query.page_index = set.current_page_index;
                guard.total_pages = set.total_page_count;
                guard.columns = set.columns.clone();
                let view = TableView::build(&set, &guard.query, &self.options.id_field);
                self.renderer.render_table(&view);
                debug!(
                    generation,
                    rows = view.rows.len(),
                    page = set.current_page_index,
                    total_pages = set.total_page_count,
                    "grid: table rebuilt"
                );
                Ok(())
            }
            Err(err) => {
                error!(
                    operation = "refresh",
                    policy = %self.options.on_fetch_failure,
                    error = %err,
                    "grid: failed to load records"
                );
                if self.options.on_fetch_failure == FetchFailurePolicy::Clear {
                    self.renderer.clear_table();
                }
                Err(err).context("failed to load records")
            }
        }
    }

    pub async fn search(&self, text: &str) -> Result<()> {
        self.inner
            .lock()
            .await
            .query
            .set_search(Some(text.to_string()));
        self.refresh().await
    }

    pub async fn clear_search(&self) -> Result<()> {
        self.inner.lock().await.query.set_search(None);
        self.refresh().await
    }

    /// Returns `false` without issuing a request when already on the first
    /// page.
    pub async fn go_to_previous_page(&self) -> Result<bool> {
        let previous = {
            let mut guard = self.inner.lock().await;
            if guard.query.page_index == 0 {
                return Ok(false);
            }
            let previous = guard.query.page_index;
            guard.query.page_index -= 1;
            previous
        };
        self.refresh_after_page_move(previous, previous - 1).await
    }

    /// Returns `false` without issuing a request when already on the last
    /// known page.
    pub async fn go_to_next_page(&self) -> Result<bool> {
        let previous = {
            let mut guard = self.inner.lock().await;
            if guard.query.page_index.saturating_add(1) >= guard.total_pages {
                return Ok(false);
            }
            let previous = guard.query.page_index;
            guard.query.page_index += 1;
            previous
        };
        self.refresh_after_page_move(previous, previous + 1).await
    }

    /// A failed page move under `KeepPrevious` puts the query back on the
    /// page the table still shows.
    async fn refresh_after_page_move(&self, previous: u32, requested: u32) -> Result<bool> {
        if let Err(err) = self.refresh().await {
            if self.options.on_fetch_failure == FetchFailurePolicy::KeepPrevious {
                let mut guard = self.inner.lock().await;
                if guard.query.page_index == requested {
                    guard.query.page_index = previous;
                }
            }
            return Err(err);
        }
        Ok(true)
    }

    pub async fn sort_by(&self, column: &str) -> Result<()> {
        self.inner.lock().await.query.sort_by(column);
        self.refresh().await
    }

    pub async fn begin_create(&self) {
        let mut guard = self.inner.lock().await;
        guard.edit_session = Some(EditSession::create());
        self.renderer.open_form(&FormView::blank(&guard.columns));
    }

    pub async fn begin_edit(&self, id: &RecordId) -> Result<()> {
        let record = match self.backend.fetch(id).await {
            Ok(record) => record,
            Err(err) => {
                error!(operation = "begin_edit", record_id = %id, error = %err, "grid: failed to fetch record");
                return Err(err).with_context(|| format!("failed to fetch record {id}"));
            }
        };

        let mut guard = self.inner.lock().await;
        let form =
            FormView::populated(id.clone(), &record, &self.options.id_field, &guard.columns);
        guard.edit_session = Some(EditSession::edit(id.clone()));
        self.renderer.open_form(&form);
        Ok(())
    }

    pub async fn cancel_form(&self) {
        self.inner.lock().await.edit_session = None;
        self.renderer.close_form();
    }

    /// Update when the edit session targets a record, create otherwise.
    /// The form stays open when the mutation fails.
    pub async fn submit_form(&self, fields: Record) -> Result<()> {
        let target = self
            .inner
            .lock()
            .await
            .edit_session
            .as_ref()
            .and_then(|session| session.target_id.clone());

        let outcome = match &target {
            Some(id) => {
                // The identifier is read-only on the form and never part of
                // an update body.
                let mut body = fields;
                body.0.remove(&self.options.id_field);
                self.backend.update(id, &body).await
            }
            None => self.backend.create(&fields).await,
        };

        if let Err(err) = outcome {
            let operation = if target.is_some() { "update" } else { "create" };
            error!(
                operation,
                record_id = ?target.as_ref().map(RecordId::as_str),
                error = %err,
                "grid: failed to submit form"
            );
            return Err(err).context("failed to submit form");
        }

        match &target {
            Some(id) => info!(record_id = %id, "grid: record updated"),
            None => info!("grid: record created"),
        }

        self.inner.lock().await.edit_session = None;
        self.renderer.close_form();
        self.refresh().await
    }

    /// Fetches the record, hands its details to `confirm`, and deletes only
    /// when `confirm` approves. Returns whether the record was deleted.
    pub async fn confirm_delete<F>(&self, id: &RecordId, confirm: F) -> Result<bool>
    where
        F: FnOnce(&DeleteConfirmation) -> bool + Send,
    {
        let record = match self.backend.fetch(id).await {
            Ok(record) => record,
            Err(err) => {
                error!(operation = "confirm_delete", record_id = %id, error = %err, "grid: failed to fetch record for deletion");
                return Err(err).with_context(|| format!("failed to fetch record {id}"));
            }
        };

        let details = DeleteConfirmation::new(id.clone(), &record);
        if !confirm(&details) {
            debug!(record_id = %id, "grid: delete not confirmed");
            return Ok(false);
        }

        if let Err(err) = self.backend.delete(id).await {
            error!(operation = "delete", record_id = %id, error = %err, "grid: failed to delete record");
            return Err(err).with_context(|| format!("failed to delete record {id}"));
        }
        info!(record_id = %id, "grid: record deleted");

        self.refresh().await?;
        Ok(true)
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
