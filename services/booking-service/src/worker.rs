use chrono::Utc;
use kafka_broker::KafkaManager;
use log::{error, info, warn};
use rdkafka::consumer::StreamConsumer;
use rdkafka::message::{Message, OwnedMessage};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;

use crate::cache;
use crate::event_client::{EventServiceClient, EventServiceError, ServiceContext};
use crate::models::{
    is_terminal_status, BookingRequest, BookingStatusUpdate, NotificationBookingData,
    NotificationRequest, StatusTransition, BOOKING_CONFIRMED, BOOKING_FAILED, BOOKING_PROCESSING,
    NOTIFICATION_BOOKING_CONFIRMED, NOTIFICATION_BOOKING_FAILED, PAYMENT_COMPLETED,
    PAYMENT_FAILED, PAYMENT_IN_PROGRESS, PAYMENT_REFUND_PENDING,
};
use crate::payment::PaymentProcessor;
use crate::repository::{BookingRepository, RepositoryError};

const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);
const METRICS_INTERVAL: Duration = Duration::from_secs(30);

struct WorkerContext {
    repo: BookingRepository,
    event_service: EventServiceClient,
    payment: PaymentProcessor,
    notification_topic: String,
    processed: AtomicI64,
    active: AtomicI64,
}

impl WorkerContext {
    /// Writes the booking row (terminal-status guarded) and the advisory
    /// cache snapshot. Returns whether the transition was applied.
    async fn apply_transition(
        &self,
        transition: StatusTransition,
        message: &str,
    ) -> Result<bool, String> {
        let applied = self
            .repo
            .update_booking_status(&transition)
            .await
            .map_err(|e| format!("failed to update booking status: {}", e))?;

        if applied {
            cache::set_booking_status(&BookingStatusUpdate {
                booking_id: transition.booking_id.clone(),
                status: transition.status.clone(),
                message: message.to_string(),
                updated_at: Utc::now(),
            })
            .await;
        } else {
            warn!(
                "Skipped transition of booking {} to {}: already terminal",
                transition.booking_id, transition.status
            );
        }

        Ok(applied)
    }

    async fn send_notification(
        &self,
        request: &BookingRequest,
        notification_type: &str,
    ) -> Result<(), String> {
        let notification = NotificationRequest {
            notification_type: notification_type.to_string(),
            recipient_email: request.user_email.clone(),
            booking_data: NotificationBookingData {
                booking_id: request.booking_id.clone(),
                event_name: request.event_name.clone(),
                venue: request.venue.clone(),
                event_date: request.event_date,
                seats: request.seats.clone(),
                total_amount: request.payment_info.amount,
                user_name: request.user_name.clone(),
            },
            timestamp: Utc::now(),
        };

        let payload = serde_json::to_string(&notification)
            .map_err(|e| format!("failed to encode notification: {}", e))?;

        let kafka = KafkaManager::global().ok_or("Kafka manager not initialized")?;
        kafka
            .send_message(&self.notification_topic, &request.booking_id, &payload)
            .await
            .map_err(|e| format!("failed to publish notification: {}", e))
    }
}

fn commit(consumer: &StreamConsumer, msg: &OwnedMessage) {
    if let Err(e) = KafkaManager::commit_offset(consumer, msg) {
        error!(
            "Failed to commit offset {}@{} on {}: {}",
            msg.partition(),
            msg.offset(),
            msg.topic(),
            e
        );
    }
}

/// Drives one booking request to a terminal state. The offset is committed
/// only once every side effect of the message is durable; an `Err` leaves it
/// uncommitted so the log redelivers.
async fn process_message(
    ctx: &WorkerContext,
    consumer: &StreamConsumer,
    msg: &OwnedMessage,
) -> Result<(), String> {
    let Some(payload) = msg.payload() else {
        commit(consumer, msg);
        return Ok(());
    };

    let request: BookingRequest = match serde_json::from_slice(payload) {
        Ok(request) => request,
        Err(e) => {
            // poison message: drop it, keep the partition moving
            warn!("Dropping undecodable booking request: {}", e);
            commit(consumer, msg);
            return Ok(());
        }
    };

    info!(
        "Processing booking: {} for user: {}",
        request.booking_id, request.user_id
    );

    match ctx.repo.get_booking(&request.booking_id).await {
        Ok(existing) if is_terminal_status(&existing.status) => {
            info!(
                "Booking {} already {}; redelivery is a no-op",
                request.booking_id, existing.status
            );
            commit(consumer, msg);
            return Ok(());
        }
        Ok(_) => {}
        Err(RepositoryError::NotFound) => {
            warn!(
                "Booking {} not found, dropping message",
                request.booking_id
            );
            commit(consumer, msg);
            return Ok(());
        }
        Err(e) => return Err(format!("failed to load booking {}: {}", request.booking_id, e)),
    }

    ctx.apply_transition(
        StatusTransition {
            booking_id: request.booking_id.clone(),
            status: BOOKING_PROCESSING.to_string(),
            payment_status: PAYMENT_IN_PROGRESS.to_string(),
            error_message: None,
            confirmed_at: None,
            failed_at: None,
        },
        "Processing payment...",
    )
    .await?;

    let service_ctx = ServiceContext {
        user_id: request.user_id.clone(),
        email: request.user_email.clone(),
        name: Some(request.user_name.clone()),
    };

    if let Err(payment_err) = ctx.payment.charge(&request.payment_info).await {
        // compensate before the booking goes terminal: the seats must be
        // free again when a retry arrives with a fresh hold
        if let Err(e) = ctx
            .event_service
            .release_hold(&request.hold_id, &service_ctx)
            .await
        {
            error!(
                "Failed to release hold {} after payment failure: {}",
                request.hold_id, e
            );
        }

        let error_message = format!("Payment failed: {}", payment_err);
        let applied = ctx
            .apply_transition(
                StatusTransition {
                    booking_id: request.booking_id.clone(),
                    status: BOOKING_FAILED.to_string(),
                    payment_status: PAYMENT_FAILED.to_string(),
                    error_message: Some(error_message.clone()),
                    confirmed_at: None,
                    failed_at: Some(Utc::now()),
                },
                &error_message,
            )
            .await?;
        if applied {
            ctx.send_notification(&request, NOTIFICATION_BOOKING_FAILED)
                .await?;
        }
        commit(consumer, msg);
        return Ok(());
    }

    if let Err(confirm_err) = ctx
        .event_service
        .confirm_hold(&request.hold_id, &service_ctx)
        .await
    {
        // an unreachable or failing hold engine is not a verdict on the
        // hold; leave the offset uncommitted and let redelivery retry
        match confirm_err {
            EventServiceError::HoldNotFound | EventServiceError::HoldExpired => {}
            _ => {
                return Err(format!(
                    "failed to confirm hold {} for booking {}: {}",
                    request.hold_id, request.booking_id, confirm_err
                ));
            }
        }

        // payment already went through; the hold is expired or the seats are
        // gone, so the amount is owed back to the user
        let error_message = format!("Failed to confirm seats: {}", confirm_err);
        let applied = ctx
            .apply_transition(
                StatusTransition {
                    booking_id: request.booking_id.clone(),
                    status: BOOKING_FAILED.to_string(),
                    payment_status: PAYMENT_REFUND_PENDING.to_string(),
                    error_message: Some(error_message.clone()),
                    confirmed_at: None,
                    failed_at: Some(Utc::now()),
                },
                &error_message,
            )
            .await?;
        if applied {
            ctx.send_notification(&request, NOTIFICATION_BOOKING_FAILED)
                .await?;
        }
        commit(consumer, msg);
        return Ok(());
    }

    let applied = ctx
        .apply_transition(
            StatusTransition {
                booking_id: request.booking_id.clone(),
                status: BOOKING_CONFIRMED.to_string(),
                payment_status: PAYMENT_COMPLETED.to_string(),
                error_message: None,
                confirmed_at: Some(Utc::now()),
                failed_at: None,
            },
            "Booking confirmed successfully",
        )
        .await?;
    if applied {
        ctx.send_notification(&request, NOTIFICATION_BOOKING_CONFIRMED)
            .await?;
    }

    info!("Successfully processed booking: {}", request.booking_id);
    commit(consumer, msg);
    Ok(())
}

pub struct BookingProcessor {
    ctx: Arc<WorkerContext>,
    max_workers: usize,
}

impl BookingProcessor {
    pub fn new(
        repo: BookingRepository,
        event_service: EventServiceClient,
        payment: PaymentProcessor,
        notification_topic: String,
        max_workers: usize,
    ) -> Self {
        BookingProcessor {
            ctx: Arc::new(WorkerContext {
                repo,
                event_service,
                payment,
                notification_topic,
                processed: AtomicI64::new(0),
                active: AtomicI64::new(0),
            }),
            max_workers: max_workers.max(1),
        }
    }

    /// Single reader, N workers. Idle workers publish their job slot into the
    /// ready queue; the reader blocks when nobody is idle, which back-pressures
    /// the log instead of buffering internally.
    pub async fn start(&self, consumer: StreamConsumer, mut shutdown: watch::Receiver<bool>) {
        info!(
            "Starting booking processor with {} workers...",
            self.max_workers
        );

        let consumer = Arc::new(consumer);
        let (ready_tx, mut ready_rx) =
            mpsc::channel::<mpsc::Sender<OwnedMessage>>(self.max_workers);

        for worker_id in 0..self.max_workers {
            let ctx = self.ctx.clone();
            let consumer = consumer.clone();
            let ready = ready_tx.clone();
            let mut shutdown_rx = shutdown.clone();

            tokio::spawn(async move {
                let (job_tx, mut job_rx) = mpsc::channel::<OwnedMessage>(1);
                loop {
                    if ready.send(job_tx.clone()).await.is_err() {
                        break;
                    }

                    let msg = tokio::select! {
                        job = job_rx.recv() => match job {
                            Some(msg) => msg,
                            None => break,
                        },
                        _ = shutdown_rx.changed() => break,
                    };

                    ctx.active.fetch_add(1, Ordering::SeqCst);
                    if let Err(e) = process_message(&ctx, &consumer, &msg).await {
                        error!("Worker {} error processing booking: {}", worker_id, e);
                    }
                    ctx.processed.fetch_add(1, Ordering::SeqCst);
                    ctx.active.fetch_sub(1, Ordering::SeqCst);
                }
                info!("Worker {} shutting down", worker_id);
            });
        }
        drop(ready_tx);

        {
            let ctx = self.ctx.clone();
            let mut shutdown_rx = shutdown.clone();
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(METRICS_INTERVAL);
                ticker.tick().await;
                loop {
                    tokio::select! {
                        _ = ticker.tick() => {
                            info!(
                                "Booking processor metrics - processed: {}, active workers: {}",
                                ctx.processed.load(Ordering::SeqCst),
                                ctx.active.load(Ordering::SeqCst)
                            );
                        }
                        _ = shutdown_rx.changed() => break,
                    }
                }
            });
        }

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    info!("Booking processor shutting down...");
                    break;
                }
                received = consumer.recv() => {
                    let msg = match received {
                        Ok(borrowed) => borrowed.detach(),
                        Err(e) => {
                            error!("Error reading message: {}", e);
                            continue;
                        }
                    };
                    let Some(slot) = ready_rx.recv().await else { break };
                    if slot.send(msg).await.is_err() {
                        warn!("Worker slot closed; message left for redelivery");
                    }
                }
            }
        }

        drop(ready_rx);
        self.drain().await;
    }

    async fn drain(&self) {
        let deadline = Instant::now() + SHUTDOWN_GRACE;
        loop {
            if self.ctx.active.load(Ordering::SeqCst) == 0 {
                info!("All workers finished gracefully");
                return;
            }
            if Instant::now() >= deadline {
                warn!("Shutdown timeout reached, forcing exit");
                return;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }
}
