mod kafka_manager;

pub use kafka_manager::KafkaManager;
pub use rdkafka::error::KafkaError;
