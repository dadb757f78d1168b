use super::models::Post;
use super::store::PostStore;
use crate::error::{posts_error, AppResult};
use async_trait::async_trait;
use redis::{AsyncCommands, Client as RedisClient};
use tracing::{info, warn};

/// Post store backed by Redis.
///
/// `<key>` is a sorted set of post ids scored by publish time in
/// milliseconds; `<key>:items` is a hash from id to the JSON-encoded post.
pub struct RedisPostStore {
    client: RedisClient,
    index_key: String,
    items_key: String,
}

impl RedisPostStore {
    /// Create a new store; no connection is made until first use
    pub fn new(redis_url: &str, key: &str) -> AppResult<Self> {
        info!("Using Redis post store (key {})", key);

        let client = RedisClient::open(redis_url)
            .map_err(|e| posts_error(&format!("Failed to create Redis client: {}", e)))?;

        Ok(Self {
            client,
            index_key: key.to_string(),
            items_key: format!("{}:items", key),
        })
    }

    /// Check that Redis is reachable
    pub async fn ping(&self) -> AppResult<()> {
        let mut conn = self.get_connection().await?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }

    /// Get a Redis connection from the client
    async fn get_connection(&self) -> AppResult<redis::aio::MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| posts_error(&format!("Failed to connect to Redis: {}", e)))
    }
}

/// Inclusive ZREVRANGE bounds for a window of `limit` posts after `offset`.
///
/// Negative ranks count from the tail in Redis, so a window that does not
/// fit in `isize` is reported as empty instead of wrapping.
fn rank_range(offset: usize, limit: usize) -> Option<(isize, isize)> {
    let last = offset.checked_add(limit.checked_sub(1)?)?;
    Some((isize::try_from(offset).ok()?, isize::try_from(last).ok()?))
}

#[async_trait]
impl PostStore for RedisPostStore {
    async fn latest(&self, offset: usize, limit: usize) -> AppResult<Vec<Post>> {
        let Some((start, stop)) = rank_range(offset, limit) else {
            return Ok(Vec::new());
        };

        let mut conn = self.get_connection().await?;
        let ids: Vec<String> = conn.zrevrange(&self.index_key, start, stop).await?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let raw: Vec<Option<String>> = redis::cmd("HMGET")
            .arg(&self.items_key)
            .arg(&ids)
            .query_async(&mut conn)
            .await?;

        let posts = ids
            .iter()
            .zip(raw)
            .filter_map(|(id, raw)| {
                let raw = match raw {
                    Some(raw) => raw,
                    None => {
                        warn!("Post {} is indexed but has no body", id);
                        return None;
                    }
                };
                match serde_json::from_str::<Post>(&raw) {
                    Ok(post) => Some(post),
                    Err(e) => {
                        warn!("Skipping unreadable post {}: {}", id, e);
                        None
                    }
                }
            })
            .collect();

        Ok(posts)
    }

    async fn insert(&self, post: &Post) -> AppResult<()> {
        let body = serde_json::to_string(post)?;
        let score = post.published_at.timestamp_millis();

        let mut conn = self.get_connection().await?;
        let _: () = redis::pipe()
            .atomic()
            .hset(&self.items_key, &post.id, body)
            .ignore()
            .zadd(&self.index_key, &post.id, score)
            .ignore()
            .query_async(&mut conn)
            .await?;
        Ok(())
    }
}
