mod redis_manager;

pub use fred::prelude::RedisError;
pub use redis_manager::RedisManager;
