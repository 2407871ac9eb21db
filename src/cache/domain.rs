//! Domain Cache Module
//!
//! Entity caches built on top of [`TtlStore`]: each fixes a default TTL and a
//! key naming convention (`"<entity>:<id>"`, `"<collection>:<facet>:<value>"`).

use std::sync::Arc;

use crate::cache::{Clock, SystemClock, TtlStore};
use crate::error::Result;

/// Default product TTL (10 minutes)
pub const PRODUCT_TTL_MS: u64 = 600_000;

/// Default user TTL (5 minutes)
pub const USER_TTL_MS: u64 = 300_000;

/// Default TTL for the general-purpose store (5 minutes)
pub const GENERAL_TTL_MS: u64 = 300_000;

const PRODUCT_PREFIX: &str = "product:";
const PRODUCT_COLLECTION_PREFIX: &str = "products:";
const USER_PREFIX: &str = "user:";

fn product_key(product_id: &str) -> String {
    format!("{}{}", PRODUCT_PREFIX, product_id)
}

fn category_key(category: &str) -> String {
    format!("{}category:{}", PRODUCT_COLLECTION_PREFIX, category)
}

fn user_key(user_id: &str) -> String {
    format!("{}{}", USER_PREFIX, user_id)
}

// == Product Cache ==
/// Cache for single products and per-category product listings.
#[derive(Debug)]
pub struct ProductCache<V> {
    store: TtlStore<V>,
}

impl<V: Clone> ProductCache<V> {
    /// Creates a product cache with the default 10 minute TTL.
    pub fn new() -> Result<Self> {
        Self::with_clock(PRODUCT_TTL_MS, Arc::new(SystemClock))
    }

    pub fn with_clock(default_ttl_ms: u64, clock: Arc<dyn Clock>) -> Result<Self> {
        Ok(Self {
            store: TtlStore::with_clock(default_ttl_ms, clock)?,
        })
    }

    pub fn get_product(&mut self, product_id: &str) -> Option<V> {
        self.store.get(&product_key(product_id))
    }

    pub fn set_product(&mut self, product_id: &str, product: V, ttl_ms: Option<u64>) {
        self.store.set(product_key(product_id), product, ttl_ms);
    }

    pub fn invalidate_product(&mut self, product_id: &str) -> bool {
        self.store.delete(&product_key(product_id))
    }

    pub fn get_by_category(&mut self, category: &str) -> Option<V> {
        self.store.get(&category_key(category))
    }

    pub fn set_by_category(&mut self, category: &str, products: V, ttl_ms: Option<u64>) {
        self.store.set(category_key(category), products, ttl_ms);
    }

    pub fn invalidate_category(&mut self, category: &str) -> bool {
        self.store.delete(&category_key(category))
    }

    /// Drops every product and product listing. Returns how many keys went.
    pub fn invalidate_all(&mut self) -> usize {
        self.store.invalidate_prefix(PRODUCT_PREFIX)
            + self.store.invalidate_prefix(PRODUCT_COLLECTION_PREFIX)
    }

    pub fn store(&self) -> &TtlStore<V> {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut TtlStore<V> {
        &mut self.store
    }
}

// == User Cache ==
/// Cache for user profiles keyed by user id.
#[derive(Debug)]
pub struct UserCache<V> {
    store: TtlStore<V>,
}

impl<V: Clone> UserCache<V> {
    /// Creates a user cache with the default 5 minute TTL.
    pub fn new() -> Result<Self> {
        Self::with_clock(USER_TTL_MS, Arc::new(SystemClock))
    }

    pub fn with_clock(default_ttl_ms: u64, clock: Arc<dyn Clock>) -> Result<Self> {
        Ok(Self {
            store: TtlStore::with_clock(default_ttl_ms, clock)?,
        })
    }

    pub fn get_user(&mut self, user_id: &str) -> Option<V> {
        self.store.get(&user_key(user_id))
    }

    pub fn set_user(&mut self, user_id: &str, user: V, ttl_ms: Option<u64>) {
        self.store.set(user_key(user_id), user, ttl_ms);
    }

    pub fn invalidate_user(&mut self, user_id: &str) -> bool {
        self.store.delete(&user_key(user_id))
    }

    pub fn invalidate_all(&mut self) -> usize {
        self.store.invalidate_prefix(USER_PREFIX)
    }

    pub fn store(&self) -> &TtlStore<V> {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut TtlStore<V> {
        &mut self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ManualClock;
    use serde_json::{json, Value};

    fn product_cache() -> (ProductCache<Value>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(0));
        let cache = ProductCache::with_clock(PRODUCT_TTL_MS, clock.clone()).unwrap();
        (cache, clock)
    }

    #[test]
    fn test_product_keys_are_namespaced() {
        let (mut cache, _) = product_cache();

        cache.set_product("42", json!({"name": "Vase"}), None);
        cache.set_by_category("decor", json!([{"name": "Vase"}]), None);

        let mut keys = cache.store().keys();
        keys.sort();
        assert_eq!(keys, vec!["product:42", "products:category:decor"]);

        assert_eq!(cache.get_product("42"), Some(json!({"name": "Vase"})));
        assert_eq!(cache.get_by_category("decor"), Some(json!([{"name": "Vase"}])));
    }

    #[test]
    fn test_product_default_ttl() {
        let (mut cache, clock) = product_cache();

        cache.set_product("1", json!(1), None);
        clock.advance(PRODUCT_TTL_MS);
        assert!(cache.get_product("1").is_some());

        clock.advance(1);
        assert!(cache.get_product("1").is_none());
    }

    #[test]
    fn test_product_invalidation() {
        let (mut cache, _) = product_cache();

        cache.set_product("1", json!(1), None);
        cache.set_by_category("toys", json!([]), None);

        assert!(cache.invalidate_product("1"));
        assert!(!cache.invalidate_product("1"));
        assert!(cache.invalidate_category("toys"));
        assert!(cache.store().is_empty());
    }

    #[test]
    fn test_product_invalidate_all_leaves_other_keys() {
        let (mut cache, _) = product_cache();

        cache.set_product("1", json!(1), None);
        cache.set_product("2", json!(2), None);
        cache.set_by_category("toys", json!([]), None);
        cache.store_mut().set("banner:home", json!("sale"), None);

        assert_eq!(cache.invalidate_all(), 3);
        assert_eq!(cache.store().keys(), vec!["banner:home".to_string()]);
    }

    #[test]
    fn test_user_cache() {
        let clock = Arc::new(ManualClock::new(0));
        let mut cache: UserCache<Value> =
            UserCache::with_clock(USER_TTL_MS, clock.clone()).unwrap();

        cache.set_user("u1", json!({"email": "a@b.c"}), None);
        assert_eq!(cache.store().keys(), vec!["user:u1".to_string()]);
        assert!(cache.get_user("u1").is_some());

        clock.advance(USER_TTL_MS + 1);
        assert!(cache.get_user("u1").is_none());

        cache.set_user("u2", json!({}), Some(10));
        cache.set_user("u3", json!({}), Some(10));
        assert_eq!(cache.invalidate_all(), 2);
    }

    #[test]
    fn test_default_constructors() {
        let products: ProductCache<Value> = ProductCache::new().unwrap();
        let users: UserCache<Value> = UserCache::new().unwrap();

        assert_eq!(products.store().default_ttl_ms(), PRODUCT_TTL_MS);
        assert_eq!(users.store().default_ttl_ms(), USER_TTL_MS);
    }
}
