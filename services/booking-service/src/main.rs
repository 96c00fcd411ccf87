use actix_web::{web, App, HttpServer};
use dotenvy::dotenv;
use kafka_broker::KafkaManager;
use log::info;
use redis_client::RedisManager;
use sqlx::postgres::PgPoolOptions;

use booking_service::config::Config;
use booking_service::controllers::booking_controller::{
    get_booking_status, health, list_user_bookings, stream_booking_status, submit_booking,
};
use booking_service::event_client::EventServiceClient;
use booking_service::middleware::auth::AuthMiddleware;
use booking_service::repository::BookingRepository;

async fn run() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init();

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

    let event_service = EventServiceClient::new(&config);

    let port = config.port;
    let repo_data = web::Data::new(repo);
    let config_data = web::Data::new(config);
    let client_data = web::Data::new(event_service);

    info!("Starting booking-service on port {}", port);

    HttpServer::new(move || {
        App::new()
            .app_data(repo_data.clone())
            .app_data(config_data.clone())
            .app_data(client_data.clone())
            .service(health)
            .service(
                web::scope("")
                    .wrap(AuthMiddleware)
                    .service(submit_booking)
                    .service(get_booking_status)
                    .service(stream_booking_status)
                    .service(list_user_bookings),
            )
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await
}

fn main() -> std::io::Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("Failed to build Tokio runtime");
    runtime.block_on(run())
}
