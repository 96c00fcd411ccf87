use dotenvy::dotenv;
use kafka_broker::KafkaManager;
use log::info;
use redis_client::RedisManager;
use sqlx::postgres::PgPoolOptions;
use tokio::sync::watch;

use booking_service::config::Config;
use booking_service::event_client::EventServiceClient;
use booking_service::payment::PaymentProcessor;
use booking_service::repository::BookingRepository;
use booking_service::worker::BookingProcessor;

#[tokio::main]
async fn main() {
    dotenv().ok();
    env_logger::init();

    info!("Starting booking worker");

    let config = Config::from_env();

    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(&config.database_url)
        .await
        .expect("Failed to create Postgres pool");

    let repo = BookingRepository::new(pool);
    repo.init_schema()
        .await
        .expect("Failed to initialize schema");
    info!("Connected to Postgres, schema ready");

    let redis_manager =
        RedisManager::init_global(&config.redis_url).expect("Failed to initialize Redis manager");
    redis_manager
        .connect()
        .await
        .expect("Failed to connect to Redis");

    let kafka = KafkaManager::init_global(&config.kafka_brokers)
        .expect("Failed to initialize Kafka manager");
    kafka
        .create_topics(vec![
            (config.booking_topic.as_str(), 1, 1),
            (config.notification_topic.as_str(), 1, 1),
        ])
        .await;

    let consumer = kafka
        .create_consumer(&config.consumer_group, &[config.booking_topic.as_str()])
        .expect("Failed to create Kafka consumer");

    let event_service = EventServiceClient::new(&config);
    let payment = PaymentProcessor::new(config.payment_latency_ms, config.payment_failure_rate);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received shutdown signal, stopping worker...");
            let _ = shutdown_tx.send(true);
        }
    });

    let processor = BookingProcessor::new(
        repo,
        event_service,
        payment,
        config.notification_topic.clone(),
        config.max_workers,
    );
    processor.start(consumer, shutdown_rx).await;

    info!("Worker stopped gracefully");
}
