pub mod dispatcher;
pub mod queue;
pub mod transport;
pub mod worker;

pub use dispatcher::{dispatch, dispatch_event, DispatchReceipt, DispatchRequest};
pub use queue::{DeadJob, NotificationJob, NotificationQueue};
pub use transport::{InMemoryTransport, LogTransport, NotificationTransport, Transports};
pub use worker::{run_notification_worker, run_visibility_reaper};
