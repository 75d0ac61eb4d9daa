//! Headless admin watcher.
//!
//! Keeps one collection in sync with the backend and logs every refreshed
//! snapshot and notification until interrupted.

use std::sync::Arc;

use site_admin_sync::models::{
    ClimateFeature, EmissionsRecord, JobApplication, JobPosting, JourneyMilestone, Project,
    ResourceKind, StorySubmission, TeamMember,
};
use site_admin_sync::{
    init_tracing, ApiClient, AuthContext, Config, FileTokenStore, HttpEventChannel,
    ListSyncController, Notifier, QueryState, RealtimeChannel, Resource,
};
use tokio::sync::broadcast::error::RecvError;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    init_tracing(&config);

    tracing::info!("Starting site admin watcher");
    tracing::info!("API: {}", config.api_url);
    tracing::info!("Token file: {:?}", config.token_path);

    let kind: ResourceKind = config.watch.parse()?;

    let token_store = FileTokenStore::new(&config.token_path);
    let auth = AuthContext::new(Arc::new(token_store));
    if auth.store().load().is_none() {
        tracing::warn!("No admin token found. Requests will be sent unauthenticated.");
    }

    let api = ApiClient::new(&config, auth.clone())?;
    let notifier = Notifier::new(config.notification_ttl);

    let channel = match &config.realtime_url {
        Some(url) => {
            tracing::info!("Realtime: {}", url);
            Some(HttpEventChannel::new(reqwest::Client::new(), url, auth))
        }
        None => {
            tracing::warn!("No realtime URL configured (SITE_ADMIN_REALTIME_URL). Changes from other sessions will not be picked up.");
            None
        }
    };
    let channel = channel.as_ref().map(|c| c as &dyn RealtimeChannel);

    match kind {
        ResourceKind::Jobs => watch::<JobPosting>(&config, api, notifier, channel).await,
        ResourceKind::Applications => {
            watch::<JobApplication>(&config, api, notifier, channel).await
        }
        ResourceKind::Stories => watch::<StorySubmission>(&config, api, notifier, channel).await,
        ResourceKind::Journey => watch::<JourneyMilestone>(&config, api, notifier, channel).await,
        ResourceKind::Team => watch::<TeamMember>(&config, api, notifier, channel).await,
        ResourceKind::Projects => watch::<Project>(&config, api, notifier, channel).await,
        ResourceKind::ClimateFeatures => {
            watch::<ClimateFeature>(&config, api, notifier, channel).await
        }
        ResourceKind::Emissions => watch::<EmissionsRecord>(&config, api, notifier, channel).await,
    }
}

async fn watch<T: Resource>(
    config: &Config,
    api: ApiClient,
    notifier: Notifier,
    channel: Option<&dyn RealtimeChannel>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut notifications = notifier.subscribe();
    let controller = ListSyncController::<T>::new(api, notifier, QueryState::new(config.page_size));

    // Failures are reported through notifications
    if controller.reload().await.is_ok() {
        log_snapshot(&controller).await;
    }

    let handle = channel.map(|c| controller.watch(c)).transpose()?;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            received = notifications.recv() => match received {
                Ok(notification) => {
                    tracing::info!("[{:?}] {}", notification.severity, notification.message);
                    log_snapshot(&controller).await;
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!("Skipped {} notifications", skipped);
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    tracing::info!("Shutting down");
    if let Some(handle) = handle {
        handle.shutdown().await;
    }
    controller.shutdown();
    Ok(())
}

async fn log_snapshot<T: Resource>(controller: &ListSyncController<T>) {
    let snapshot = controller.snapshot().await;
    tracing::info!(
        "{}: {} shown, {} total, page {}/{}",
        T::COLLECTION,
        snapshot.items.len(),
        snapshot.total_items,
        snapshot.query.page + 1,
        snapshot.page_count().max(1)
    );
    for item in &snapshot.items {
        tracing::debug!("  {} {:?}", item.id(), item);
    }
}
