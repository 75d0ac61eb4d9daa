//! List synchronization controller.
//!
//! A `ListSyncController<T>` owns the local copy of one page of a remote
//! collection. Three things change it: query changes, the user's own
//! mutations, and realtime invalidation signals from other sessions. The local
//! copy is only ever replaced by a list response or patched from a confirmed
//! mutation response.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::StreamExt;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::api::{ApiClient, Page};
use crate::errors::{SyncError, SyncResult};
use crate::form::{FormFields, FormSession};
use crate::models::Resource;
use crate::notify::Notifier;
use crate::query::{page_count, QueryState};
use crate::realtime::{ChangeAction, InvalidationSignal, RealtimeChannel};

/// Explicit go-ahead for destructive actions.
pub trait Confirm {
    fn confirm(&self, prompt: &str) -> bool;
}

impl<F> Confirm for F
where
    F: Fn(&str) -> bool,
{
    fn confirm(&self, prompt: &str) -> bool {
        self(prompt)
    }
}

/// What a view renders.
#[derive(Debug, Clone)]
pub struct Snapshot<T> {
    pub items: Vec<T>,
    /// Server-reported size of the whole filtered collection
    pub total_items: u64,
    pub query: QueryState,
    pub loading: bool,
    /// User-facing text of the last failed load
    pub error: Option<String>,
}

impl<T> Snapshot<T> {
    pub fn page_count(&self) -> u64 {
        page_count(self.total_items, self.query.page_size)
    }
}

struct Inner<T> {
    api: ApiClient,
    notifier: Notifier,
    state: RwLock<Snapshot<T>>,
    /// Sequence number of the most recently issued load
    latest: AtomicU64,
    shutdown: CancellationToken,
}

/// Keeps one list consistent with a remote collection.
pub struct ListSyncController<T: Resource> {
    inner: Arc<Inner<T>>,
}

impl<T: Resource> Clone for ListSyncController<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Resource> ListSyncController<T> {
    pub fn new(api: ApiClient, notifier: Notifier, query: QueryState) -> Self {
        Self {
            inner: Arc::new(Inner {
                api,
                notifier,
                state: RwLock::new(Snapshot {
                    items: Vec::new(),
                    total_items: 0,
                    query,
                    loading: false,
                    error: None,
                }),
                latest: AtomicU64::new(0),
                shutdown: CancellationToken::new(),
            }),
        }
    }

    pub fn notifier(&self) -> &Notifier {
        &self.inner.notifier
    }

    pub async fn snapshot(&self) -> Snapshot<T> {
        self.inner.state.read().await.clone()
    }

    pub async fn query(&self) -> QueryState {
        self.inner.state.read().await.query.clone()
    }

    /// Fetch `query` and replace the local page with the result.
    ///
    /// Only the most recently issued load is applied. A load overtaken by a
    /// newer one still returns its own page, but leaves the snapshot alone.
    pub async fn load(&self, query: QueryState) -> SyncResult<Page<T>> {
        let seq = {
            let mut state = self.inner.state.write().await;
            state.query = query.clone();
            state.loading = true;
            self.inner.latest.fetch_add(1, Ordering::SeqCst) + 1
        };

        let result = self.guarded(self.inner.api.list::<T>(&query)).await;

        let mut state = self.inner.state.write().await;
        if self.inner.latest.load(Ordering::SeqCst) != seq {
            tracing::debug!("Discarding superseded {} load #{}", T::COLLECTION, seq);
            return result;
        }
        state.loading = false;
        if self.inner.shutdown.is_cancelled() {
            return Err(SyncError::Cancelled);
        }

        match &result {
            Ok(page) => {
                tracing::debug!(
                    "Loaded {} {} of {}",
                    page.items.len(),
                    T::COLLECTION,
                    page.total_items
                );
                state.items = page.items.clone();
                state.total_items = page.total_items;
                state.error = None;
            }
            Err(e) => {
                state.error = Some(e.user_message());
                drop(state);
                self.inner
                    .notifier
                    .failure(&format!("load {}", T::COLLECTION), e);
            }
        }
        result
    }

    /// Load again with the current query.
    pub async fn reload(&self) -> SyncResult<Page<T>> {
        let query = self.query().await;
        self.load(query).await
    }

    pub async fn set_filter(&self, key: &str, value: &str) -> SyncResult<Page<T>> {
        let mut query = self.query().await;
        query.set_filter(key, value);
        self.load(query).await
    }

    /// Jump to a 0-based page.
    pub async fn set_page(&self, page: u32) -> SyncResult<Page<T>> {
        let query = self.query().await.with_page(page);
        self.load(query).await
    }

    pub async fn set_page_size(&self, page_size: u32) -> SyncResult<Page<T>> {
        let mut query = self.query().await;
        query.set_page_size(page_size);
        self.load(query).await
    }

    pub async fn set_sort(&self, sort_key: &str) -> SyncResult<Page<T>> {
        let query = self.query().await.with_sort(sort_key);
        self.load(query).await
    }

    /// Validate and create a record, then refetch the list.
    pub async fn create(&self, fields: &FormFields) -> SyncResult<T> {
        let context = format!("create {}", T::LABEL);
        if let Err(e) = T::form_schema().validate(fields) {
            self.inner.notifier.failure(&context, &e);
            return Err(e);
        }

        match self.guarded(self.inner.api.create::<T>(fields.to_payload())).await {
            Ok(item) => {
                tracing::info!("Created {} {}", T::COLLECTION, item.id());
                self.inner
                    .notifier
                    .success(format!("{} created successfully", T::LABEL));
                self.refresh().await;
                Ok(item)
            }
            Err(e) => {
                self.inner.notifier.failure(&context, &e);
                Err(e)
            }
        }
    }

    /// Full-form edit of one record.
    pub async fn update(&self, id: &str, fields: &FormFields) -> SyncResult<T> {
        if let Err(e) = T::form_schema().validate(fields) {
            self.inner
                .notifier
                .failure(&format!("update {}", T::LABEL), &e);
            return Err(e);
        }
        self.put(id, fields).await
    }

    /// Edit only the supplied fields of one record.
    pub async fn update_partial(&self, id: &str, fields: &FormFields) -> SyncResult<T> {
        if let Err(e) = T::form_schema().validate_partial(fields) {
            self.inner
                .notifier
                .failure(&format!("update {}", T::LABEL), &e);
            return Err(e);
        }
        self.put(id, fields).await
    }

    async fn put(&self, id: &str, fields: &FormFields) -> SyncResult<T> {
        match self
            .guarded(self.inner.api.update::<T>(id, fields.to_payload()))
            .await
        {
            Ok(item) => {
                tracing::info!("Updated {} {}", T::COLLECTION, id);
                self.inner
                    .notifier
                    .success(format!("{} updated successfully", T::LABEL));
                self.apply_confirmed(item.clone()).await;
                Ok(item)
            }
            Err(e) => {
                self.inner
                    .notifier
                    .failure(&format!("update {}", T::LABEL), &e);
                Err(e)
            }
        }
    }

    /// Submit an open dialog. It closes on success and keeps its input otherwise.
    pub async fn submit(&self, form: &mut FormSession) -> SyncResult<T> {
        form.begin();
        let result = match form.editing.clone() {
            Some(id) => self.update(&id, &form.fields).await,
            None => self.create(&form.fields).await,
        };
        form.finish(&result);
        result
    }

    /// Single-field transition, e.g. `toggle-active` or `approve`.
    ///
    /// The record may leave the current filter, so the list is refetched.
    pub async fn patch(&self, id: &str, action: &str, body: Option<Value>) -> SyncResult<Option<T>> {
        match self
            .guarded(self.inner.api.patch::<T>(id, action, body))
            .await
        {
            Ok(reply) => {
                tracing::info!("Applied {} to {} {}", action, T::COLLECTION, id);
                let message = reply
                    .message
                    .unwrap_or_else(|| format!("{} updated successfully", T::LABEL));
                self.inner.notifier.success(message);
                self.refresh().await;
                Ok(reply.data)
            }
            Err(e) => {
                self.inner
                    .notifier
                    .failure(&format!("{} {}", action, T::LABEL), &e);
                Err(e)
            }
        }
    }

    /// Delete a record once `confirm` agrees.
    ///
    /// Returns `Ok(false)` without any request when the user declines.
    pub async fn remove(&self, id: &str, confirm: &impl Confirm) -> SyncResult<bool> {
        let prompt = format!(
            "Delete this {}? This cannot be undone.",
            T::LABEL.to_lowercase()
        );
        if !confirm.confirm(&prompt) {
            tracing::debug!("Delete of {} {} declined", T::COLLECTION, id);
            return Ok(false);
        }

        match self.guarded(self.inner.api.delete::<T>(id)).await {
            Ok(()) => {
                tracing::info!("Deleted {} {}", T::COLLECTION, id);
                {
                    let mut state = self.inner.state.write().await;
                    let before = state.items.len();
                    state.items.retain(|item| item.id() != id);
                    if state.items.len() < before {
                        state.total_items = state.total_items.saturating_sub(1);
                    }
                }
                self.inner
                    .notifier
                    .success(format!("{} deleted successfully", T::LABEL));
                Ok(true)
            }
            Err(e) => {
                self.inner
                    .notifier
                    .failure(&format!("delete {}", T::LABEL), &e);
                Err(e)
            }
        }
    }

    /// React to a realtime signal: refetch when it names this collection.
    pub async fn on_invalidation(&self, signal: InvalidationSignal) -> SyncResult<bool> {
        if !signal.concerns::<T>() {
            return Ok(false);
        }
        tracing::debug!("{} invalidated ({:?})", T::COLLECTION, signal.action);
        if let Some(action) = signal.action {
            let verb = match action {
                ChangeAction::Created => "added",
                ChangeAction::Updated => "updated",
                ChangeAction::Deleted => "removed",
            };
            self.inner
                .notifier
                .info(format!("A {} was {}", T::LABEL.to_lowercase(), verb));
        }
        self.reload().await.map(|_| true)
    }

    /// Server-computed statistics for this collection.
    pub async fn stats<S: DeserializeOwned>(&self) -> SyncResult<S> {
        let result = self.guarded(self.inner.api.stats::<S>(T::COLLECTION)).await;
        if let Err(e) = &result {
            self.inner
                .notifier
                .failure(&format!("{} stats", T::COLLECTION), e);
        }
        result
    }

    /// Join this collection's realtime room and refetch on every signal.
    pub fn watch(&self, channel: &dyn RealtimeChannel) -> SyncResult<WatchHandle> {
        let mut subscription = channel.subscribe(&T::room())?;
        let token = self.inner.shutdown.child_token();
        let task_token = token.clone();
        let controller = self.clone();

        tracing::info!("Watching {} via {}", T::COLLECTION, subscription.room());
        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = task_token.cancelled() => break,
                    next = subscription.next() => match next {
                        // Not raced against the watch token: controller shutdown
                        // cancels inside `load`. Failures are already surfaced.
                        Some(signal) => {
                            let _ = controller.on_invalidation(signal).await;
                        }
                        None => {
                            tracing::info!("Realtime subscription for {} closed", T::COLLECTION);
                            break;
                        }
                    },
                }
            }
        });

        Ok(WatchHandle {
            token,
            task: Some(task),
        })
    }

    /// Tear down: cancel in-flight requests and every watch.
    pub fn shutdown(&self) {
        tracing::debug!("Shutting down {} controller", T::COLLECTION);
        self.inner.shutdown.cancel();
    }

    async fn apply_confirmed(&self, item: T) {
        let replaced = {
            let mut state = self.inner.state.write().await;
            match state.items.iter_mut().find(|existing| existing.id() == item.id()) {
                Some(existing) => {
                    *existing = item;
                    true
                }
                None => false,
            }
        };
        if !replaced {
            self.refresh().await;
        }
    }

    /// Reload after a mutation. A failure is already surfaced by `load`.
    async fn refresh(&self) {
        if let Err(e) = self.reload().await {
            tracing::debug!("Refresh of {} after mutation failed: {}", T::COLLECTION, e);
        }
    }

    async fn guarded<R>(&self, request: impl Future<Output = SyncResult<R>>) -> SyncResult<R> {
        tokio::select! {
            biased;
            _ = self.inner.shutdown.cancelled() => Err(SyncError::Cancelled),
            result = request => result,
        }
    }
}

/// A running realtime watch. Dropping it leaves the room.
#[derive(Debug)]
pub struct WatchHandle {
    token: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl WatchHandle {
    pub fn is_active(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Stop watching and wait until the subscription is released.
    pub async fn shutdown(mut self) {
        self.token.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::warn!("Realtime watch task failed: {}", e);
            }
        }
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthContext;
    use crate::models::JobPosting;

    fn offline_controller() -> ListSyncController<JobPosting> {
        // Port 9 (discard) on localhost; nothing in these tests reaches it
        let api = ApiClient::with_client(
            reqwest::Client::new(),
            "http://127.0.0.1:9",
            AuthContext::anonymous(),
        );
        ListSyncController::new(api, Notifier::default(), QueryState::new(25))
    }

    #[tokio::test]
    async fn test_declined_delete_sends_nothing() {
        let controller = offline_controller();
        let asked = std::cell::Cell::new(false);
        let removed = controller
            .remove("j1", &|prompt: &str| {
                asked.set(true);
                assert!(prompt.contains("job posting"));
                false
            })
            .await
            .unwrap();
        assert!(asked.get());
        assert!(!removed);
    }

    #[tokio::test]
    async fn test_invalid_create_sends_nothing() {
        let controller = offline_controller();
        let mut notifications = controller.notifier().subscribe();
        let err = controller
            .create(&FormFields::new().set("title", "Engineer"))
            .await
            .unwrap_err();
        assert_eq!(err.field_errors().len(), 3);
        assert_eq!(notifications.recv().await.unwrap().message, "Department is required");
    }

    #[tokio::test]
    async fn test_foreign_signal_is_ignored() {
        let controller = offline_controller();
        let handled = controller
            .on_invalidation(InvalidationSignal::new("stories", None))
            .await
            .unwrap();
        assert!(!handled);
    }

    #[tokio::test]
    async fn test_shutdown_cancels_requests() {
        let controller = offline_controller();
        controller.shutdown();
        let err = controller.reload().await.unwrap_err();
        assert!(err.is_cancelled());
        let snapshot = controller.snapshot().await;
        assert!(snapshot.items.is_empty());
        assert!(!snapshot.loading);
    }
}
