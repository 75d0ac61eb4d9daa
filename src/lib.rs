//! Site admin list synchronization.
//!
//! Keeps admin views of the content site's collections (job postings,
//! applications, stories, journey milestones, team, projects, climate features,
//! emissions data) consistent with the REST backend through fetches, the
//! user's own mutations and realtime invalidation.

pub mod api;
pub mod auth;
pub mod config;
pub mod errors;
pub mod form;
pub mod models;
pub mod notify;
pub mod preview;
pub mod query;
pub mod realtime;
pub mod sync;

pub use api::{ApiClient, Page};
pub use auth::{AuthContext, FileTokenStore, MemoryTokenStore, TokenStore};
pub use config::Config;
pub use errors::{SyncError, SyncResult};
pub use form::{Attachment, FormFields, FormSchema, FormSession};
pub use models::Resource;
pub use notify::{Notification, Notifier, Severity};
pub use query::QueryState;
pub use realtime::{HttpEventChannel, InvalidationSignal, LocalHub, RealtimeChannel};
pub use sync::{Confirm, ListSyncController, Snapshot, WatchHandle};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::LogFormat;

/// Install the global tracing subscriber. `RUST_LOG` wins over the config.
pub fn init_tracing(config: &Config) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let registry = tracing_subscriber::registry().with(env_filter);
    match config.log_format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}
