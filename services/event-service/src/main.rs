use actix_web::{web, App, HttpServer};
use dotenvy::dotenv;
use log::info;
use redis_client::RedisManager;
use sqlx::postgres::PgPoolOptions;

use event_service::config::Config;
use event_service::controllers::event_controller::{create_event, get_event, health, list_events};
use event_service::controllers::hold_controller::{
    confirm_hold, get_hold_details, hold_seats, release_hold,
};
use event_service::middleware::auth::AuthMiddleware;
use event_service::reaper;
use event_service::repository::EventRepository;

async fn run() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init();

    let config = Config::from_env();

    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(&config.database_url)
        .await
        .expect("Failed to create Postgres pool");

    let repo = EventRepository::new(pool);
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

    tokio::spawn(reaper::run(repo.clone(), config.reaper_interval_seconds));

    let port = config.port;
    let repo_data = web::Data::new(repo);
    let config_data = web::Data::new(config);

    info!("Starting event-service on port {}", port);

    HttpServer::new(move || {
        App::new()
            .app_data(repo_data.clone())
            .app_data(config_data.clone())
            .service(health)
            .service(list_events)
            .service(get_event)
            .service(
                web::scope("")
                    .wrap(AuthMiddleware)
                    .service(create_event)
                    .service(hold_seats)
                    .service(get_hold_details)
                    .service(release_hold)
                    .service(confirm_hold),
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
