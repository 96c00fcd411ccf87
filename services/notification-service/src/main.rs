use actix_web::{web, App, HttpResponse, HttpServer, Responder};
use chrono::Utc;
use dotenvy::dotenv;
use kafka_broker::KafkaManager;
use log::{error, info, warn};
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::message::{Message, OwnedMessage};
use rdkafka::util::Timeout;
use rdkafka::Offset;
use serde_json::json;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use notification_service::config::Config;
use notification_service::models::NotificationRequest;
use notification_service::relay::{DeliveryError, EmailRelay, LogEmailRelay};

enum Outcome {
    Commit,
    Redeliver,
}

async fn handle_message(msg: &OwnedMessage, relay: &dyn EmailRelay) -> Outcome {
    let Some(payload) = msg.payload() else {
        return Outcome::Commit;
    };

    let request: NotificationRequest = match serde_json::from_slice(payload) {
        Ok(request) => request,
        Err(e) => {
            warn!("Dropping undecodable notification: {}", e);
            return Outcome::Commit;
        }
    };

    info!(
        "Processing notification: {} for {}",
        request.notification_type, request.recipient_email
    );

    let Some(email) = request.to_email() else {
        warn!("Unknown notification type: {}", request.notification_type);
        return Outcome::Commit;
    };

    match relay.deliver(&email).await {
        Ok(()) => {
            info!(
                "Successfully sent {} email to {} for booking {}",
                request.notification_type,
                request.recipient_email,
                request.booking_data.booking_id
            );
            Outcome::Commit
        }
        Err(DeliveryError::Retryable(e)) => {
            error!("Retryable delivery failure, message will be redelivered: {}", e);
            Outcome::Redeliver
        }
        Err(DeliveryError::Permanent(e)) => {
            error!("Permanent delivery failure, dropping notification: {}", e);
            Outcome::Commit
        }
    }
}

async fn health(processed: web::Data<Arc<AtomicI64>>) -> impl Responder {
    HttpResponse::Ok().json(json!({
        "status": "healthy",
        "service": "notification-service",
        "timestamp": Utc::now(),
        "messages_processed": processed.load(Ordering::SeqCst)
    }))
}

fn rewind(consumer: &StreamConsumer, msg: &OwnedMessage) {
    if let Err(e) = consumer.seek(
        msg.topic(),
        msg.partition(),
        Offset::Offset(msg.offset()),
        Timeout::After(Duration::from_secs(5)),
    ) {
        error!("Failed to rewind {}@{}: {}", msg.partition(), msg.offset(), e);
    }
}

#[actix_web::main]
async fn main() {
    dotenv().ok();
    env_logger::init();

    info!("Starting notification service worker");

    let config = Config::from_env();

    let kafka = KafkaManager::init_global(&config.kafka_brokers)
        .expect("Failed to initialize Kafka manager");
    kafka
        .create_topics(vec![(config.notification_topic.as_str(), 1, 1)])
        .await;

    let consumer = kafka
        .create_consumer(&config.consumer_group, &[config.notification_topic.as_str()])
        .expect("Failed to create Kafka consumer");

    let relay = LogEmailRelay;
    let processed = Arc::new(AtomicI64::new(0));

    // health endpoint alongside the consumer
    {
        let processed = processed.clone();
        let port = config.port;
        actix_web::rt::spawn(async move {
            let counter = web::Data::new(processed);
            let server = HttpServer::new(move || {
                App::new()
                    .app_data(counter.clone())
                    .route("/health", web::get().to(health))
            })
            .bind(("0.0.0.0", port));

            match server {
                Ok(server) => {
                    if let Err(e) = server.run().await {
                        error!("Health server failed: {}", e);
                    }
                }
                Err(e) => error!("Failed to bind health server on port {}: {}", port, e),
            }
        });
    }

    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received shutdown signal, stopping worker...");
            let _ = shutdown_tx.send(true);
        }
    });

    loop {
        tokio::select! {
            _ = shutdown_rx.changed() => break,
            received = consumer.recv() => {
                let msg = match received {
                    Ok(borrowed) => borrowed.detach(),
                    Err(e) => {
                        error!("Error reading message: {}", e);
                        continue;
                    }
                };
                match handle_message(&msg, &relay).await {
                    Outcome::Commit => {
                        if let Err(e) = KafkaManager::commit_offset(&consumer, &msg) {
                            error!("Failed to commit offset: {}", e);
                        }
                        processed.fetch_add(1, Ordering::SeqCst);
                    }
                    Outcome::Redeliver => {
                        rewind(&consumer, &msg);
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                }
            }
        }
    }

    info!(
        "Worker stopped gracefully; processed {} notifications",
        processed.load(Ordering::SeqCst)
    );
}
