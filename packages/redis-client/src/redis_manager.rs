use fred::prelude::*;
use log::info;
use once_cell::sync::OnceCell;

#[derive(Clone)]
pub struct RedisManager {
    client: RedisClient,
}

static INSTANCE: OnceCell<RedisManager> = OnceCell::new();

impl RedisManager {
    pub fn new(redis_url: &str) -> Result<Self, RedisError> {
        let config = RedisConfig::from_url(redis_url)?;
        let client = RedisClient::new(config, None, None, None);

        Ok(Self { client })
    }

    pub fn init_global(redis_url: &str) -> Result<&'static RedisManager, RedisError> {
        INSTANCE.get_or_try_init(|| Self::new(redis_url))
    }

    pub fn global() -> Option<&'static RedisManager> {
        INSTANCE.get()
    }

    pub fn client(&self) -> RedisClient {
        self.client.clone()
    }

    pub async fn connect(&self) -> Result<(), RedisError> {
        self.client.connect();
        self.client.wait_for_connect().await?;
        info!("Connected to Redis");
        Ok(())
    }

    pub async fn set(&self, key: &str, value: &str) -> Result<(), RedisError> {
        self.client
            .set::<(), _, _>(key, value, None, None, false)
            .await
    }

    pub async fn set_with_ttl(
        &self,
        key: &str,
        value: &str,
        seconds: i64,
    ) -> Result<(), RedisError> {
        self.client
            .set::<(), _, _>(key, value, None, None, false)
            .await?;
        self.client.expire::<(), _>(key, seconds).await?;
        Ok(())
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>, RedisError> {
        let value: Option<String> = self.client.get(key).await?;
        Ok(value)
    }

    pub async fn delete(&self, key: &str) -> Result<(), RedisError> {
        self.client.del::<(), _>(key).await
    }

    pub async fn delete_many(&self, keys: &[String]) -> Result<(), RedisError> {
        if keys.is_empty() {
            return Ok(());
        }
        self.client.del::<(), _>(keys.to_vec()).await
    }

    // Derived cache keys register themselves in an index set so the whole
    // family can be dropped without a SCAN.
    pub async fn add_to_index(&self, index: &str, key: &str) -> Result<(), RedisError> {
        self.client.sadd::<(), _, _>(index, key).await
    }

    pub async fn drop_indexed_keys(&self, index: &str) -> Result<(), RedisError> {
        let keys: Vec<String> = self.client.smembers(index).await?;
        if !keys.is_empty() {
            self.client.del::<(), _>(keys).await?;
        }
        self.client.del::<(), _>(index).await
    }
}
