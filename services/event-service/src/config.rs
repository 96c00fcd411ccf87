use std::env;

#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub db_max_connections: u32,
    pub redis_url: String,
    pub hold_ttl_minutes: i64,
    pub seat_row_width: usize,
    pub reaper_interval_seconds: u64,
    pub cache_ttl_event_seconds: i64,
    pub cache_ttl_seats_seconds: i64,
    pub cache_ttl_list_seconds: i64,
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

impl Config {
    pub fn from_env() -> Self {
        // the auth middleware reads this per request; fail fast if missing
        env::var("JWT_SECRET").expect("JWT_SECRET must be set");

        Config {
            port: var_or("PORT", "8082").parse().unwrap_or(8082),
            database_url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
            db_max_connections: var_or("DB_MAX_CONNECTIONS", "25").parse().unwrap_or(25),
            redis_url: var_or("REDIS_URL", "redis://127.0.0.1:6379"),
            hold_ttl_minutes: var_or("HOLD_TTL_MINUTES", "15").parse().unwrap_or(15),
            seat_row_width: var_or("SEAT_ROW_WIDTH", "50").parse().unwrap_or(50),
            reaper_interval_seconds: var_or("HOLD_REAPER_INTERVAL_SECONDS", "2")
                .parse()
                .unwrap_or(2),
            cache_ttl_event_seconds: var_or("CACHE_TTL_EVENT_SECONDS", "300").parse().unwrap_or(300),
            cache_ttl_seats_seconds: var_or("CACHE_TTL_SEATS_SECONDS", "30").parse().unwrap_or(30),
            cache_ttl_list_seconds: var_or("CACHE_TTL_LIST_SECONDS", "120").parse().unwrap_or(120),
        }
    }
}
