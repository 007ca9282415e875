//! Application state shared across HTTP handlers.

use crate::config::Config;
use crate::notifications::NotificationStore;
use pickup_core::{
    Clock, EventRepository, EventService, InMemoryEventRepository, InMemoryUserDirectory,
    LifecycleEngine, MembershipManager, Notifier, QueuedNotifier, SystemClock,
    TokioTriggerScheduler,
};
use pickup_postgres::PostgresEventRepository;
use std::sync::Arc;
use tracing::info;

/// Shared state for all HTTP handlers; cloned (cheaply via `Arc`) per
/// request.
#[derive(Clone)]
pub struct AppState {
    /// Event creation, queries and guarded mutations
    pub events: Arc<EventService>,
    /// Join/leave operations
    pub membership: Arc<MembershipManager>,
    /// User directory (thin registration wrapper included)
    pub users: Arc<InMemoryUserDirectory>,
    /// Delivered notifications and the realtime signal
    pub notifications: Arc<NotificationStore>,
}

impl AppState {
    /// Build state from configuration, choosing the event repository
    /// backend from `DATABASE_URL`.
    ///
    /// # Errors
    ///
    /// Returns an error when the Postgres connection or migration fails.
    pub async fn from_config(config: &Config) -> anyhow::Result<Self> {
        let repository: Arc<dyn EventRepository> = match &config.database.url {
            Some(url) => {
                let repository =
                    PostgresEventRepository::connect(url, config.database.max_connections).await?;
                repository.migrate().await?;
                info!("using postgres event repository");
                Arc::new(repository)
            }
            None => {
                info!("DATABASE_URL not set; using in-memory event repository");
                Arc::new(InMemoryEventRepository::new())
            }
        };
        Ok(Self::assemble(repository))
    }

    /// Build fully in-memory state, as used by the test suites.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::assemble(Arc::new(InMemoryEventRepository::new()))
    }

    /// Wire the core components around the chosen repository.
    fn assemble(repository: Arc<dyn EventRepository>) -> Self {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let users = Arc::new(InMemoryUserDirectory::new(Arc::clone(&clock)));
        let notifications = Arc::new(NotificationStore::new());
        let notifier: Arc<dyn Notifier> = Arc::new(QueuedNotifier::spawn(
            Arc::clone(&notifications) as _,
            Arc::clone(&clock),
        ));

        let engine: Arc<dyn pickup_core::TriggerHandler> = Arc::new(LifecycleEngine::new(
            Arc::clone(&repository),
            Arc::clone(&notifier),
            Arc::clone(&clock),
        ));
        let scheduler = Arc::new(TokioTriggerScheduler::new(engine, Arc::clone(&clock)));

        let events = Arc::new(EventService::new(
            Arc::clone(&repository),
            Arc::clone(&scheduler) as _,
            Arc::clone(&users) as _,
            Arc::clone(&clock),
        ));
        let membership = Arc::new(MembershipManager::new(
            repository,
            Arc::clone(&users) as _,
            notifier,
            clock,
        ));

        Self {
            events,
            membership,
            users,
            notifications,
        }
    }
}
