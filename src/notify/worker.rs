use std::sync::Arc;

use chrono::Utc;
use tokio::time::Duration;

use crate::models::notification::ChannelDelivery;
use crate::notify::queue::{DeadJob, NackOutcome, NotificationJob};
use crate::state::AppState;

/// Drains the notification queue until it is closed and empty. Several of
/// these run concurrently; the queue hands each job to exactly one worker
/// at a time.
pub async fn run_notification_worker(state: Arc<AppState>, worker: usize) {
    tracing::info!(worker, "notification worker started");
    while let Some(job) = state.notify_queue.pull_or_wait().await {
        handle_job(&state, job).await;
        state
            .metrics
            .notify_queue_depth
            .set(state.notify_queue.depth() as i64);
    }
    tracing::info!(worker, "notification worker stopped");
}

async fn handle_job(state: &AppState, job: NotificationJob) {
    let channel = job.channel.as_str();
    let transport = state.transports.for_channel(job.channel).clone();

    let timer = state
        .metrics
        .notification_send_seconds
        .with_label_values(&[channel])
        .start_timer();
    let result = transport.send(&job).await;
    timer.observe_duration();

    match result {
        Ok(provider_message_id) => {
            state.notify_queue.ack(job.id);
            state
                .metrics
                .notification_sends_total
                .with_label_values(&[channel, "sent"])
                .inc();
            tracing::info!(
                notification_id = %job.notification_id,
                channel,
                attempt = job.attempts,
                "notification sent"
            );
            let sent = ChannelDelivery::Sent {
                provider_message_id,
                at: Utc::now(),
            };
            if let Err(err) = state
                .store
                .set_channel_status(job.notification_id, job.channel, sent)
                .await
            {
                tracing::error!(
                    notification_id = %job.notification_id,
                    channel,
                    error = %err,
                    "failed to record sent status"
                );
            }
        }
        Err(err) => {
            state
                .metrics
                .notification_sends_total
                .with_label_values(&[channel, "failed"])
                .inc();
            let reason = err.to_string();
            match state.notify_queue.nack(job.id, &reason) {
                Some(NackOutcome::Requeued) => {
                    tracing::warn!(
                        notification_id = %job.notification_id,
                        channel,
                        attempt = job.attempts,
                        error = %reason,
                        "send failed, job requeued"
                    );
                }
                Some(NackOutcome::DeadLettered(dead)) => {
                    record_dead_letter(state, &dead).await;
                }
                None => {
                    tracing::warn!(
                        notification_id = %job.notification_id,
                        channel,
                        "send failed for a job the queue had already swept"
                    );
                }
            }
        }
    }
}

/// Periodically returns expired in-flight jobs to the queue. Jobs that
/// expire on their final attempt are dead-lettered here, with the channel
/// marked failed just as a worker would have.
pub async fn run_visibility_reaper(state: Arc<AppState>, every: Duration) {
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    loop {
        ticker.tick().await;
        let sweep = state.notify_queue.requeue_expired();
        if sweep.requeued > 0 {
            tracing::warn!(requeued = sweep.requeued, "redelivering expired notification jobs");
        }
        for dead in &sweep.dead {
            record_dead_letter(&state, dead).await;
        }
        state
            .metrics
            .notify_queue_depth
            .set(state.notify_queue.depth() as i64);
    }
}

async fn record_dead_letter(state: &AppState, dead: &DeadJob) {
    tracing::error!(
        notification_id = %dead.job.notification_id,
        channel = dead.job.channel.as_str(),
        attempts = dead.job.attempts,
        reason = %dead.reason,
        "notification job dead-lettered"
    );
    let failed = ChannelDelivery::Failed {
        attempts: dead.job.attempts,
        reason: dead.reason.clone(),
    };
    if let Err(err) = state
        .store
        .set_channel_status(dead.job.notification_id, dead.job.channel, failed)
        .await
    {
        tracing::error!(
            notification_id = %dead.job.notification_id,
            error = %err,
            "failed to record dead-lettered status"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::models::notification::{Channel, NotificationType};
    use crate::models::preference::Contact;
    use crate::notify::dispatcher::{dispatch, DispatchRequest};
    use crate::notify::transport::{InMemoryTransport, Transports};
    use tokio::time::{sleep, timeout};
    use uuid::Uuid;

    fn wired_state(config: Config) -> (Arc<AppState>, Arc<InMemoryTransport>) {
        let mut state = AppState::new(config);
        let transport = Arc::new(InMemoryTransport::new());
        state.transports = Transports {
            email: transport.clone(),
            sms: transport.clone(),
            push: transport.clone(),
        };
        (Arc::new(state), transport)
    }

    async fn seeded_recipient(state: &AppState) -> Uuid {
        let recipient = Uuid::new_v4();
        state
            .store
            .upsert_contact(Contact {
                recipient_id: recipient,
                name: "Dana".to_string(),
                email: Some("dana@example.com".to_string()),
                phone: Some("+15550100".to_string()),
                push_token: Some("tok-dana".to_string()),
            })
            .await
            .unwrap();
        recipient
    }

    fn request_for(recipient: Uuid) -> DispatchRequest {
        DispatchRequest {
            recipient_id: recipient,
            title: "Delivery update".to_string(),
            message: "Your delivery is now IN_TRANSIT".to_string(),
            data: serde_json::Value::Null,
            delivery_id: None,
            order_id: None,
        }
    }

    #[tokio::test]
    async fn worker_sends_and_marks_each_channel() {
        let (state, transport) = wired_state(Config::default());
        let recipient = seeded_recipient(&state).await;
        let handle = tokio::spawn(run_notification_worker(state.clone(), 0));

        let receipt = dispatch(
            &state,
            NotificationType::DeliveryStatusChanged,
            request_for(recipient),
        )
        .await
        .unwrap();

        sleep(Duration::from_millis(200)).await;

        assert_eq!(transport.sent().len(), 3);
        let stored = state
            .store
            .notification(receipt.notification_id)
            .await
            .unwrap()
            .unwrap();
        assert!(stored.is_processed());
        for channel in [Channel::Email, Channel::Sms, Channel::Push] {
            assert!(matches!(
                stored.channel_status.get(&channel),
                Some(ChannelDelivery::Sent { .. })
            ));
        }
        assert!(state
            .store
            .unprocessed_notifications()
            .await
            .unwrap()
            .is_empty());

        state.notify_queue.close();
        timeout(Duration::from_secs(1), handle).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn failing_transport_dead_letters_after_max_attempts() {
        let config = Config {
            notify_max_attempts: 2,
            ..Config::default()
        };
        let (state, transport) = wired_state(config);
        transport.set_fail_on_send(true);
        let recipient = seeded_recipient(&state).await;
        let handle = tokio::spawn(run_notification_worker(state.clone(), 0));

        let receipt = dispatch(
            &state,
            NotificationType::SystemAlert,
            request_for(recipient),
        )
        .await
        .unwrap();
        assert_eq!(receipt.enqueued.len(), 2);

        sleep(Duration::from_millis(300)).await;

        let dead = state.notify_queue.dead_letters();
        assert_eq!(dead.len(), 2);
        assert!(dead.iter().all(|d| d.job.attempts == 2));

        let stored = state
            .store
            .notification(receipt.notification_id)
            .await
            .unwrap()
            .unwrap();
        for channel in [Channel::Email, Channel::Push] {
            assert!(matches!(
                stored.channel_status.get(&channel),
                Some(ChannelDelivery::Failed { attempts: 2, .. })
            ));
        }
        assert!(stored.is_processed());

        state.notify_queue.close();
        timeout(Duration::from_secs(1), handle).await.unwrap().unwrap();
    }
}
