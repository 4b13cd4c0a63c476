/// Redis caching layer for the FAQ generator.
///
/// All operations degrade to a miss or a no-op when Redis is absent or failing.
///
/// Key schema:
/// - `faqgen:v1:rows` JSON Vec<FaqRow> (TTL 300s, dropped on every write)
/// - `faqgen:v1:validation:{sha256(model|question|steps_text)}` feedback string (TTL 3600s)
use sha2::{Digest, Sha256};

use faq_common::redis::RedisCache;

use crate::store::FaqRow;

const KEY_PREFIX: &str = "faqgen:v1:";
const ROWS_TTL_SECS: u64 = 300;
const VALIDATION_TTL_SECS: u64 = 3600;

pub struct FaqCache {
    redis: RedisCache,
}

impl FaqCache {
    pub fn new(redis: RedisCache) -> Self {
        Self { redis }
    }

    pub async fn get_rows(&self) -> Option<Vec<FaqRow>> {
        self.redis.get_json(&rows_key()).await
    }

    pub async fn set_rows(&self, rows: &[FaqRow]) {
        self.redis
            .set_json_with_ttl(&rows_key(), rows, ROWS_TTL_SECS)
            .await;
    }

    pub async fn invalidate_rows(&self) {
        self.redis.delete(&rows_key()).await;
    }

    pub async fn get_validation(&self, model: &str, question: &str, steps: &str) -> Option<String> {
        self.redis.get(&validation_key(model, question, steps)).await
    }

    pub async fn set_validation(&self, model: &str, question: &str, steps: &str, feedback: &str) {
        let key = validation_key(model, question, steps);
        self.redis
            .set_with_ttl(&key, feedback, VALIDATION_TTL_SECS)
            .await;
    }
}

fn rows_key() -> String {
    format!("{KEY_PREFIX}rows")
}

fn validation_key(model: &str, question: &str, steps: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(model.as_bytes());
    hasher.update(b"|");
    hasher.update(question.as_bytes());
    hasher.update(b"|");
    hasher.update(steps.as_bytes());
    let hash = hasher.finalize();
    format!("{KEY_PREFIX}validation:{:x}", hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_key_is_stable_and_input_sensitive() {
        let a = validation_key("m", "q", "Step 1: a");
        assert_eq!(a, validation_key("m", "q", "Step 1: a"));
        assert!(a.starts_with("faqgen:v1:validation:"));
        assert_eq!(a.len(), "faqgen:v1:validation:".len() + 64);
        assert_ne!(a, validation_key("m", "q", "Step 1: b"));
        assert_ne!(a, validation_key("other", "q", "Step 1: a"));
    }

    #[tokio::test]
    async fn disabled_cache_is_a_no_op() {
        let cache = FaqCache::new(RedisCache::disabled());
        cache.set_rows(&[]).await;
        assert!(cache.get_rows().await.is_none());
        cache.set_validation("m", "q", "s", "looks good").await;
        assert!(cache.get_validation("m", "q", "s").await.is_none());
        cache.invalidate_rows().await;
    }
}
