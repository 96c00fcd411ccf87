use log::{error, info};
use once_cell::sync::OnceCell;
use rdkafka::{
    admin::{AdminClient, AdminOptions, NewTopic, TopicReplication},
    client::DefaultClientContext,
    config::ClientConfig,
    consumer::{CommitMode, Consumer, StreamConsumer},
    error::KafkaError,
    message::{Message, OwnedMessage},
    producer::{FutureProducer, FutureRecord},
    util::Timeout,
    Offset, TopicPartitionList,
};
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct KafkaManager {
    brokers: String,
    producer: Arc<FutureProducer>,
    admin: Arc<AdminClient<DefaultClientContext>>,
}

static INSTANCE: OnceCell<KafkaManager> = OnceCell::new();

impl KafkaManager {
    pub fn init_global(brokers: &str) -> Result<&'static KafkaManager, KafkaError> {
        INSTANCE.get_or_try_init(|| KafkaManager::new(brokers))
    }

    pub fn global() -> Option<&'static KafkaManager> {
        INSTANCE.get()
    }

    fn new(brokers: &str) -> Result<Self, KafkaError> {
        let producer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("message.timeout.ms", "5000")
            .create::<FutureProducer>()?;

        let admin: AdminClient<_> = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .create()?;

        Ok(KafkaManager {
            brokers: brokers.to_string(),
            producer: Arc::new(producer),
            admin: Arc::new(admin),
        })
    }

    pub async fn create_topics(&self, topics: Vec<(&str, i32, i32)>) {
        let new_topics: Vec<NewTopic> = topics
            .into_iter()
            .map(|(name, partitions, replication)| {
                NewTopic::new(name, partitions, TopicReplication::Fixed(replication))
            })
            .collect();

        let res = self
            .admin
            .create_topics(&new_topics, &AdminOptions::new())
            .await;

        match res {
            Ok(result) => info!("Topic creation result: {:?}", result),
            Err(e) => error!("Failed to create topics: {:?}", e),
        }
    }

    pub async fn send_message(&self, topic: &str, key: &str, data: &str) -> Result<(), KafkaError> {
        let record = FutureRecord::to(topic).key(key).payload(data);

        match self
            .producer
            .send(record, Timeout::After(Duration::from_secs(5)))
            .await
        {
            Ok(_) => Ok(()),
            Err((e, _)) => {
                error!("Failed to send message to topic '{}': {:?}", topic, e);
                Err(e)
            }
        }
    }

    /// Consumer with auto-commit disabled: the caller owns offset advancement
    /// and must call `commit_offset` once a message's side effects are durable.
    pub fn create_consumer(
        &self,
        group_id: &str,
        topics: &[&str],
    ) -> Result<StreamConsumer, KafkaError> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", &self.brokers)
            .set("group.id", group_id)
            .set("auto.offset.reset", "earliest")
            .set("enable.auto.commit", "false")
            .create()?;

        consumer.subscribe(topics)?;
        Ok(consumer)
    }

    pub fn commit_offset(consumer: &StreamConsumer, msg: &OwnedMessage) -> Result<(), KafkaError> {
        let mut tpl = TopicPartitionList::new();
        tpl.add_partition_offset(msg.topic(), msg.partition(), Offset::Offset(msg.offset() + 1))?;
        consumer.commit(&tpl, CommitMode::Async)
    }
}
