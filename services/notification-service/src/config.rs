use std::env;

#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    pub kafka_brokers: String,
    pub notification_topic: String,
    pub consumer_group: String,
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

impl Config {
    pub fn from_env() -> Self {
        Config {
            port: var_or("PORT", "8084").parse().unwrap_or(8084),
            kafka_brokers: var_or("KAFKA_BROKERS", "localhost:9092"),
            notification_topic: var_or("KAFKA_NOTIFICATION_TOPIC", "notification-requests"),
            consumer_group: var_or("KAFKA_CONSUMER_GROUP", "notification-service"),
        }
    }
}
