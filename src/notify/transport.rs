use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::notification::Channel;
use crate::notify::queue::NotificationJob;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("provider rejected the message: {0}")]
    Rejected(String),
}

/// Provider seam for one channel. Real SMTP/SMS/push SDKs would sit behind
/// this; the crate ships a logging implementation and an in-memory one for
/// tests.
#[async_trait]
pub trait NotificationTransport: Send + Sync {
    fn name(&self) -> &'static str;

    /// Delivers one job and returns the provider's message id.
    async fn send(&self, job: &NotificationJob) -> Result<String, TransportError>;
}

/// Default transport: writes the message to the log and pretends it went
/// out. Useful for local runs without provider credentials.
pub struct LogTransport {
    name: &'static str,
}

impl LogTransport {
    pub fn new(name: &'static str) -> Self {
        Self { name }
    }
}

#[async_trait]
impl NotificationTransport for LogTransport {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn send(&self, job: &NotificationJob) -> Result<String, TransportError> {
        tracing::info!(
            transport = self.name,
            destination = %job.destination,
            title = %job.title,
            "notification sent"
        );
        Ok(format!("{}-{}", self.name, Uuid::new_v4()))
    }
}

/// Recording transport with failure injection, for exercising retry and
/// dead-letter paths.
#[derive(Default)]
pub struct InMemoryTransport {
    sent: Mutex<Vec<NotificationJob>>,
    fail_on_send: AtomicBool,
    sequence: AtomicU64,
}

impl InMemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_on_send(&self, fail: bool) {
        self.fail_on_send.store(fail, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<NotificationJob> {
        match self.sent.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl NotificationTransport for InMemoryTransport {
    fn name(&self) -> &'static str {
        "in_memory"
    }

    async fn send(&self, job: &NotificationJob) -> Result<String, TransportError> {
        if self.fail_on_send.load(Ordering::SeqCst) {
            return Err(TransportError::Rejected("injected failure".to_string()));
        }
        match self.sent.lock() {
            Ok(mut guard) => guard.push(job.clone()),
            Err(poisoned) => poisoned.into_inner().push(job.clone()),
        }
        let n = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("mem-{n}"))
    }
}

/// The per-channel transports the workers send through.
#[derive(Clone)]
pub struct Transports {
    pub email: Arc<dyn NotificationTransport>,
    pub sms: Arc<dyn NotificationTransport>,
    pub push: Arc<dyn NotificationTransport>,
}

impl Transports {
    /// Logging transports on every channel.
    pub fn log() -> Self {
        Self {
            email: Arc::new(LogTransport::new("email")),
            sms: Arc::new(LogTransport::new("sms")),
            push: Arc::new(LogTransport::new("push")),
        }
    }

    pub fn for_channel(&self, channel: Channel) -> &Arc<dyn NotificationTransport> {
        match channel {
            Channel::Email => &self.email,
            Channel::Sms => &self.sms,
            Channel::Push => &self.push,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job() -> NotificationJob {
        NotificationJob {
            id: Uuid::new_v4(),
            notification_id: Uuid::new_v4(),
            channel: Channel::Email,
            recipient_id: Uuid::new_v4(),
            destination: "dana@example.com".to_string(),
            title: "Order update".to_string(),
            message: "Your order is now READY".to_string(),
            attempts: 1,
        }
    }

    #[tokio::test]
    async fn in_memory_transport_records_sends() {
        let transport = InMemoryTransport::new();

        let first = transport.send(&job()).await.unwrap();
        let second = transport.send(&job()).await.unwrap();

        assert_eq!(first, "mem-1");
        assert_eq!(second, "mem-2");
        assert_eq!(transport.sent().len(), 2);
    }

    #[tokio::test]
    async fn failure_injection_toggles() {
        let transport = InMemoryTransport::new();
        transport.set_fail_on_send(true);
        assert!(transport.send(&job()).await.is_err());

        transport.set_fail_on_send(false);
        assert!(transport.send(&job()).await.is_ok());
        assert_eq!(transport.sent().len(), 1);
    }
}
