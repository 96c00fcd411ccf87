use std::env;

#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub db_max_connections: u32,
    pub redis_url: String,
    pub jwt_secret: String,
    pub kafka_brokers: String,
    pub booking_topic: String,
    pub notification_topic: String,
    pub consumer_group: String,
    pub event_service_url: String,
    pub http_max_idle_per_host: usize,
    pub http_idle_timeout_seconds: u64,
    pub http_request_timeout_seconds: u64,
    pub max_workers: usize,
    pub payment_latency_ms: u64,
    pub payment_failure_rate: f64,
    pub stream_poll_interval_seconds: u64,
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

impl Config {
    pub fn from_env() -> Self {
        Config {
            port: var_or("PORT", "8083").parse().unwrap_or(8083),
            database_url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
            db_max_connections: var_or("DB_MAX_CONNECTIONS", "25").parse().unwrap_or(25),
            redis_url: var_or("REDIS_URL", "redis://127.0.0.1:6379"),
            jwt_secret: env::var("JWT_SECRET").expect("JWT_SECRET must be set"),
            kafka_brokers: var_or("KAFKA_BROKERS", "localhost:9092"),
            booking_topic: var_or("KAFKA_BOOKING_TOPIC", "booking-requests"),
            notification_topic: var_or("KAFKA_NOTIFICATION_TOPIC", "notification-requests"),
            consumer_group: var_or("KAFKA_CONSUMER_GROUP", "booking-service"),
            event_service_url: var_or("EVENT_SERVICE_URL", "http://event-service:8082"),
            http_max_idle_per_host: var_or("HTTP_MAX_IDLE_CONNS_PER_HOST", "10")
                .parse()
                .unwrap_or(10),
            http_idle_timeout_seconds: var_or("HTTP_IDLE_CONN_TIMEOUT", "90").parse().unwrap_or(90),
            http_request_timeout_seconds: var_or("HTTP_REQUEST_TIMEOUT", "30")
                .parse()
                .unwrap_or(30),
            max_workers: var_or("WORKER_MAX_WORKERS", "20").parse().unwrap_or(20),
            payment_latency_ms: var_or("PAYMENT_LATENCY_MS", "2000").parse().unwrap_or(2000),
            payment_failure_rate: var_or("PAYMENT_FAILURE_RATE", "0.05").parse().unwrap_or(0.05),
            stream_poll_interval_seconds: var_or("STREAM_POLL_INTERVAL_SECONDS", "2")
                .parse()
                .unwrap_or(2),
        }
    }
}
