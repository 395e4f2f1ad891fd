use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;

use crate::config::Config;
use crate::lifecycle::TrackingEvent;
use crate::notify::queue::NotificationQueue;
use crate::notify::transport::Transports;
use crate::observability::metrics::Metrics;
use crate::routing::{DeadlineSequencer, RoutePlanner};
use crate::store::{Datastore, MemoryStore};

pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn Datastore>,
    pub planner: Arc<dyn RoutePlanner>,
    pub transports: Transports,
    pub notify_queue: Arc<NotificationQueue>,
    pub tracking_events_tx: broadcast::Sender<TrackingEvent>,
    pub metrics: Metrics,
}

impl AppState {
    /// Default wiring: in-memory store, deadline planner, log transports.
    /// The fields are public so startup (or a test) can swap any
    /// collaborator before the state is shared.
    pub fn new(config: Config) -> Self {
        let (tracking_events_tx, _unused_rx) = broadcast::channel(config.event_buffer_size);
        let notify_queue = Arc::new(NotificationQueue::new(
            Duration::from_secs(config.notify_visibility_timeout_secs),
            config.notify_max_attempts,
        ));

        Self {
            store: Arc::new(MemoryStore::new()),
            planner: Arc::new(DeadlineSequencer),
            transports: Transports::log(),
            notify_queue,
            tracking_events_tx,
            metrics: Metrics::new(),
            config,
        }
    }
}
