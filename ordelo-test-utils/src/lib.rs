//! Ordelo Test Utilities
//!
//! Shared test infrastructure for the Ordelo workspace:
//! - Proptest generators for roots, containers and items
//! - An in-memory key-value cache with failure injection
//! - Fixtures for common aggregates and repository wiring
//! - Assertions over the storage error taxonomy

// Re-export the in-memory store from its source crate
pub use ordelo_storage::InMemoryDocumentStore;

// Re-export core types for convenience
pub use ordelo_core::{
    Admin, CacheError, Cart, ContainerKind, Deadline, EntityId, EntityType, Ingredient,
    IngredientRequirement, Item, Location, OrdeloConfig, OrdeloError, OrdeloResult, Profile,
    Recipe, Role, RootKind, StorageError, Store, User, UserOrder, ValidationError, Vendor,
    VendorOrder,
};

use async_trait::async_trait;
use ordelo_storage::{CacheKey, CacheStats, KeyValueCache};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::{Duration, Instant};

// ============================================================================
// MOCK CACHE
// ============================================================================

/// Bytes written by [`MockCache::corrupt`]. Not valid JSON.
pub const CORRUPT_PAYLOAD: &[u8] = b"{\"truncated\":";

/// In-memory [`KeyValueCache`] for tests.
///
/// Entries honour their TTL. Each operation can be switched to fail with a
/// backend error, and every call is counted so tests can check which cache
/// operations a repository call issued.
#[derive(Debug, Default)]
pub struct MockCache {
    entries: RwLock<HashMap<String, (Vec<u8>, Instant)>>,
    stats: RwLock<CacheStats>,
    fail_get: AtomicBool,
    fail_set: AtomicBool,
    fail_exists: AtomicBool,
    fail_delete: AtomicBool,
    latency_ms: AtomicU64,
    get_calls: AtomicU64,
    set_calls: AtomicU64,
    exists_calls: AtomicU64,
    delete_calls: AtomicU64,
}

impl MockCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `get` fail with a backend error.
    pub fn fail_reads(&self, fail: bool) {
        self.fail_get.store(fail, Ordering::SeqCst);
    }

    /// Make `set` fail with a backend error.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_set.store(fail, Ordering::SeqCst);
    }

    /// Make both `exists` and `delete` fail with a backend error.
    pub fn fail_invalidation(&self, fail: bool) {
        self.fail_exists.store(fail, Ordering::SeqCst);
        self.fail_delete.store(fail, Ordering::SeqCst);
    }

    /// Delay every operation by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        self.latency_ms
            .store(latency.as_millis() as u64, Ordering::SeqCst);
    }

    /// Overwrite `key` with bytes that do not decode.
    pub fn corrupt(&self, key: &CacheKey) {
        self.put(key, CORRUPT_PAYLOAD.to_vec(), Duration::from_secs(3600));
    }

    /// Raw bytes stored under `key`, ignoring expiry.
    pub fn raw(&self, key: &CacheKey) -> Option<Vec<u8>> {
        self.entries
            .read()
            .ok()
            .and_then(|entries| entries.get(&key.to_string()).map(|(v, _)| v.clone()))
    }

    /// Whether a live entry exists under `key`.
    pub fn contains(&self, key: &CacheKey) -> bool {
        let now = Instant::now();
        self.entries
            .read()
            .map(|entries| {
                entries
                    .get(&key.to_string())
                    .is_some_and(|(_, expires_at)| *expires_at > now)
            })
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get_calls(&self) -> u64 {
        self.get_calls.load(Ordering::SeqCst)
    }

    pub fn set_calls(&self) -> u64 {
        self.set_calls.load(Ordering::SeqCst)
    }

    pub fn exists_calls(&self) -> u64 {
        self.exists_calls.load(Ordering::SeqCst)
    }

    pub fn delete_calls(&self) -> u64 {
        self.delete_calls.load(Ordering::SeqCst)
    }

    fn put(&self, key: &CacheKey, value: Vec<u8>, ttl: Duration) {
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(key.to_string(), (value, Instant::now() + ttl));
        }
    }

    async fn simulate_latency(&self) {
        let ms = self.latency_ms.load(Ordering::SeqCst);
        if ms > 0 {
            tokio::time::sleep(Duration::from_millis(ms)).await;
        }
    }

    fn check(&self, flag: &AtomicBool, operation: &str) -> Result<(), CacheError> {
        if flag.load(Ordering::SeqCst) {
            return Err(CacheError::Backend {
                operation: operation.to_string(),
                reason: "injected failure".to_string(),
            });
        }
        Ok(())
    }

    fn poisoned(operation: &str) -> CacheError {
        CacheError::Backend {
            operation: operation.to_string(),
            reason: "mock cache lock poisoned".to_string(),
        }
    }
}

#[async_trait]
impl KeyValueCache for MockCache {
    async fn get(&self, key: &CacheKey) -> Result<Option<Vec<u8>>, CacheError> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await;
        self.check(&self.fail_get, "get")?;

        let now = Instant::now();
        let mut entries = self.entries.write().map_err(|_| Self::poisoned("get"))?;
        let mut stats = self.stats.write().map_err(|_| Self::poisoned("get"))?;

        let name = key.to_string();
        match entries.get(&name) {
            Some((value, expires_at)) if *expires_at > now => {
                stats.hits += 1;
                Ok(Some(value.clone()))
            }
            Some(_) => {
                entries.remove(&name);
                stats.misses += 1;
                stats.expirations += 1;
                Ok(None)
            }
            None => {
                stats.misses += 1;
                Ok(None)
            }
        }
    }

    async fn set(&self, key: &CacheKey, value: &[u8], ttl: Duration) -> Result<(), CacheError> {
        self.set_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await;
        self.check(&self.fail_set, "set")?;

        self.entries
            .write()
            .map_err(|_| Self::poisoned("set"))?
            .insert(key.to_string(), (value.to_vec(), Instant::now() + ttl));
        Ok(())
    }

    async fn exists(&self, keys: &[CacheKey]) -> Result<u64, CacheError> {
        self.exists_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await;
        self.check(&self.fail_exists, "exists")?;

        let now = Instant::now();
        let entries = self.entries.read().map_err(|_| Self::poisoned("exists"))?;
        Ok(keys
            .iter()
            .filter(|key| {
                entries
                    .get(&key.to_string())
                    .is_some_and(|(_, expires_at)| *expires_at > now)
            })
            .count() as u64)
    }

    async fn delete(&self, keys: &[CacheKey]) -> Result<u64, CacheError> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await;
        self.check(&self.fail_delete, "delete")?;

        let mut entries = self.entries.write().map_err(|_| Self::poisoned("delete"))?;
        Ok(keys
            .iter()
            .filter(|key| entries.remove(&key.to_string()).is_some())
            .count() as u64)
    }

    async fn stats(&self) -> Result<CacheStats, CacheError> {
        let entries = self.entries.read().map_err(|_| Self::poisoned("stats"))?;
        let mut stats = self
            .stats
            .read()
            .map_err(|_| Self::poisoned("stats"))?
            .clone();
        stats.entry_count = entries.len() as u64;
        stats.memory_bytes = entries.values().map(|(v, _)| v.len() as u64).sum();
        Ok(stats)
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for generating Ordelo entity types.
    //!
    //! Containers and items come out unassigned (nil identifiers), the way a
    //! caller hands them to a create operation.

    use super::*;
    use proptest::collection::vec;
    use proptest::prelude::*;
    use uuid::Uuid;

    /// Generate an arbitrary, usually non-nil, identifier.
    pub fn arb_entity_id() -> impl Strategy<Value = EntityId> {
        any::<[u8; 16]>().prop_map(|bytes| EntityId::from_uuid(Uuid::from_bytes(bytes)))
    }

    pub fn arb_name() -> impl Strategy<Value = String> {
        "[a-z]{1,12}"
    }

    pub fn arb_unit() -> impl Strategy<Value = String> {
        prop_oneof![Just("g"), Just("kg"), Just("ml"), Just("l"), Just("pcs")]
            .prop_map(String::from)
    }

    /// Positive price rounded to cents.
    pub fn arb_price() -> impl Strategy<Value = f64> {
        (1u32..100_000).prop_map(|cents| f64::from(cents) / 100.0)
    }

    pub fn arb_item() -> impl Strategy<Value = Item> {
        (arb_name(), 1i32..1000, arb_unit(), arb_price(), 1i32..20).prop_map(
            |(name, unit_quantity, unit, price, quantity)| Item {
                ingredient_id: EntityId::nil(),
                name,
                unit_quantity,
                unit,
                price,
                quantity,
            },
        )
    }

    pub fn arb_items(max: usize) -> impl Strategy<Value = Vec<Item>> {
        vec(arb_item(), 0..=max)
    }

    pub fn arb_recipe() -> impl Strategy<Value = Recipe> {
        (arb_name(), "[a-z ]{0,40}", 1i32..240, 1i32..12, arb_items(4)).prop_map(
            |(title, description, preparation_time, serving_size, items)| Recipe {
                id: EntityId::nil(),
                title,
                description,
                preparation_time,
                serving_size,
                items,
            },
        )
    }

    pub fn arb_cart() -> impl Strategy<Value = Cart> {
        (arb_entity_id(), arb_entity_id(), arb_price(), arb_items(4)).prop_map(
            |(vendor_id, store_id, total_price, items)| Cart {
                id: EntityId::nil(),
                vendor_id,
                store_id,
                total_price,
                items,
            },
        )
    }

    pub fn arb_user_order() -> impl Strategy<Value = UserOrder> {
        (
            arb_entity_id(),
            arb_entity_id(),
            prop_oneof![Just("pickup"), Just("delivery")],
            prop_oneof![Just("pending"), Just("shipped"), Just("delivered")],
            prop_oneof![Just("unpaid"), Just("paid")],
            arb_price(),
            arb_items(4),
        )
            .prop_map(
                |(store_id, vendor_id, delivery, status, payment, total_price, items)| UserOrder {
                    id: EntityId::nil(),
                    store_id,
                    vendor_id,
                    delivery_method: delivery.to_string(),
                    order_status: status.to_string(),
                    payment_status: payment.to_string(),
                    total_price,
                    items,
                },
            )
    }

    pub fn arb_location() -> impl Strategy<Value = Location> {
        (-180.0f64..180.0, -90.0f64..90.0).prop_map(|(lon, lat)| Location::point(lon, lat))
    }

    pub fn arb_store() -> impl Strategy<Value = Store> {
        (
            arb_name(),
            prop_oneof![Just("grocery"), Just("butcher"), Just("bakery")],
            proptest::option::of(arb_location()),
            arb_items(6),
        )
            .prop_map(|(name, store_type, location, items)| Store {
                id: EntityId::nil(),
                name,
                store_type: store_type.to_string(),
                location,
                items,
            })
    }

    pub fn arb_ingredient() -> impl Strategy<Value = Ingredient> {
        (arb_name(), 1i32..1000, arb_unit(), arb_price()).prop_map(
            |(name, unit_quantity, unit, price)| Ingredient {
                ingredient_id: EntityId::nil(),
                name,
                unit_quantity,
                unit,
                price,
            },
        )
    }

    pub fn arb_requirement() -> impl Strategy<Value = IngredientRequirement> {
        (arb_name(), 1i32..1000, arb_unit()).prop_map(|(name, unit_quantity, unit)| {
            IngredientRequirement {
                name,
                unit_quantity,
                unit,
            }
        })
    }

    /// Profile without an identifier. The role is left for create to force.
    pub fn arb_profile() -> impl Strategy<Value = Profile> {
        (arb_name(), "[a-z0-9 ]{0,30}", arb_name()).prop_map(|(name, address, local)| Profile {
            id: EntityId::nil(),
            email: format!("{}@example.com", local),
            name,
            address,
            password_hash: "hash".to_string(),
            role: Role::default(),
        })
    }

    pub fn arb_user() -> impl Strategy<Value = User> {
        (arb_profile(), vec(arb_recipe(), 0..3), vec(arb_cart(), 0..3)).prop_map(
            |(profile, saved_recipes, carts)| User {
                profile,
                saved_recipes,
                carts,
                orders: Vec::new(),
            },
        )
    }

    pub fn arb_vendor() -> impl Strategy<Value = Vendor> {
        (arb_profile(), vec(arb_store(), 0..3)).prop_map(|(profile, stores)| Vendor {
            profile,
            stores,
            orders: Vec::new(),
        })
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built aggregates and repository wiring for common scenarios.

    use super::*;
    use ordelo_storage::{
        CacheAside, CacheConfig, CachedAdminRepository, CachedUserRepository,
        CachedVendorRepository, DocumentAdminRepository, DocumentUserRepository,
        DocumentVendorRepository,
    };
    use std::sync::Arc;

    pub type TestUserRepository =
        CachedUserRepository<DocumentUserRepository<InMemoryDocumentStore>, MockCache>;
    pub type TestVendorRepository =
        CachedVendorRepository<DocumentVendorRepository<InMemoryDocumentStore>, MockCache>;
    pub type TestAdminRepository =
        CachedAdminRepository<DocumentAdminRepository<InMemoryDocumentStore>, MockCache>;

    /// Configuration with a short operation timeout for tests.
    pub fn test_config() -> OrdeloConfig {
        OrdeloConfig::default()
            .with_database_name("ordelo_test")
            .with_cache_ttl(Duration::from_secs(60))
            .with_operation_timeout(Duration::from_secs(5))
    }

    /// Deadline far enough out that it never fires in a test.
    pub fn generous_deadline() -> Deadline {
        Deadline::after(Duration::from_secs(5))
    }

    pub fn item(name: &str, unit_quantity: i32, unit: &str, price: f64) -> Item {
        Item {
            ingredient_id: EntityId::nil(),
            name: name.to_string(),
            unit_quantity,
            unit: unit.to_string(),
            price,
            quantity: 1,
        }
    }

    pub fn recipe(title: &str, items: Vec<Item>) -> Recipe {
        Recipe {
            title: title.to_string(),
            description: format!("How to make {}", title),
            preparation_time: 30,
            serving_size: 2,
            items,
            ..Default::default()
        }
    }

    pub fn cart(total_price: f64, items: Vec<Item>) -> Cart {
        Cart {
            vendor_id: EntityId::now_v7(),
            store_id: EntityId::now_v7(),
            total_price,
            items,
            ..Default::default()
        }
    }

    pub fn store(name: &str, items: Vec<Item>) -> Store {
        Store {
            name: name.to_string(),
            store_type: "grocery".to_string(),
            location: Some(Location::point(13.405, 52.52)),
            items,
            ..Default::default()
        }
    }

    pub fn profile(name: &str, email: &str) -> Profile {
        Profile {
            name: name.to_string(),
            address: "1 Test Street".to_string(),
            email: email.to_string(),
            password_hash: "$argon2id$test".to_string(),
            ..Default::default()
        }
    }

    /// A user with no containers.
    pub fn test_user() -> User {
        User {
            profile: profile("Ada", "ada@example.com"),
            ..Default::default()
        }
    }

    /// A user with two saved recipes.
    pub fn user_with_recipes() -> User {
        User {
            saved_recipes: vec![
                recipe(
                    "Pancakes",
                    vec![item("flour", 500, "g", 1.2), item("milk", 1, "l", 0.9)],
                ),
                recipe("Omelette", vec![item("eggs", 6, "pcs", 2.5)]),
            ],
            ..test_user()
        }
    }

    pub fn test_vendor() -> Vendor {
        Vendor {
            profile: profile("Corner Shop", "shop@example.com"),
            ..Default::default()
        }
    }

    /// A vendor with one well-stocked store and one nearly empty store.
    pub fn vendor_with_stores() -> Vendor {
        Vendor {
            stores: vec![
                store(
                    "Main Street",
                    vec![
                        item("flour", 1000, "g", 2.1),
                        item("flour", 500, "g", 1.3),
                        item("milk", 1, "l", 0.95),
                        item("eggs", 10, "pcs", 3.2),
                    ],
                ),
                store("Kiosk", vec![item("milk", 1, "l", 1.1)]),
            ],
            ..test_vendor()
        }
    }

    pub fn test_admin() -> Admin {
        Admin {
            profile: profile("Root", "admin@example.com"),
            ingredients: vec![Ingredient {
                name: "flour".to_string(),
                unit_quantity: 1000,
                unit: "g".to_string(),
                price: 2.0,
                ..Default::default()
            }],
        }
    }

    /// Shared in-memory store and mock cache.
    pub fn backends() -> (Arc<InMemoryDocumentStore>, Arc<MockCache>) {
        (
            Arc::new(InMemoryDocumentStore::new("ordelo_test")),
            Arc::new(MockCache::new()),
        )
    }

    fn aside(cache: &Arc<MockCache>) -> CacheAside<MockCache> {
        CacheAside::new(Arc::clone(cache), CacheConfig::from(&test_config()))
    }

    pub fn user_repository(
        store: &Arc<InMemoryDocumentStore>,
        cache: &Arc<MockCache>,
    ) -> TestUserRepository {
        CachedUserRepository::new(DocumentUserRepository::new(Arc::clone(store)), aside(cache))
    }

    pub fn vendor_repository(
        store: &Arc<InMemoryDocumentStore>,
        cache: &Arc<MockCache>,
    ) -> TestVendorRepository {
        CachedVendorRepository::new(
            DocumentVendorRepository::new(Arc::clone(store)),
            aside(cache),
        )
    }

    pub fn admin_repository(
        store: &Arc<InMemoryDocumentStore>,
        cache: &Arc<MockCache>,
    ) -> TestAdminRepository {
        CachedAdminRepository::new(
            DocumentAdminRepository::new(Arc::clone(store)),
            aside(cache),
        )
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions over the storage error taxonomy.

    use super::*;

    /// Assert that an OrdeloResult is NotFound for `entity_type`.
    #[track_caller]
    pub fn assert_not_found<T: std::fmt::Debug>(result: &OrdeloResult<T>, entity_type: EntityType) {
        match result {
            Err(OrdeloError::Storage(StorageError::NotFound { entity_type: et, .. })) => {
                assert_eq!(*et, entity_type, "Wrong entity type in NotFound error");
            }
            other => panic!("Expected NotFound error for {:?}, got: {:?}", entity_type, other),
        }
    }

    /// Assert that an OrdeloResult is NoEffect for `entity_type`.
    #[track_caller]
    pub fn assert_no_effect<T: std::fmt::Debug>(result: &OrdeloResult<T>, entity_type: EntityType) {
        match result {
            Err(OrdeloError::Storage(StorageError::NoEffect { entity_type: et, .. })) => {
                assert_eq!(*et, entity_type, "Wrong entity type in NoEffect error");
            }
            other => panic!("Expected NoEffect error for {:?}, got: {:?}", entity_type, other),
        }
    }

    #[track_caller]
    pub fn assert_write_concern_failure<T: std::fmt::Debug>(result: &OrdeloResult<T>) {
        match result {
            Err(OrdeloError::Storage(StorageError::WriteConcernFailure { .. })) => {}
            other => panic!("Expected WriteConcernFailure, got: {:?}", other),
        }
    }

    #[track_caller]
    pub fn assert_timeout<T: std::fmt::Debug>(result: &OrdeloResult<T>) {
        match result {
            Err(OrdeloError::Storage(StorageError::Timeout { .. })) => {}
            other => panic!("Expected Timeout, got: {:?}", other),
        }
    }

    #[track_caller]
    pub fn assert_unknown_container_kind<T: std::fmt::Debug>(result: &OrdeloResult<T>) {
        match result {
            Err(OrdeloError::Storage(StorageError::UnknownContainerKind { .. })) => {}
            other => panic!("Expected UnknownContainerKind, got: {:?}", other),
        }
    }

    #[track_caller]
    pub fn assert_validation_error<T: std::fmt::Debug>(result: &OrdeloResult<T>) {
        match result {
            Err(OrdeloError::Validation(_)) => {}
            other => panic!("Expected Validation error, got: {:?}", other),
        }
    }

    /// Assert that every identifier in `ids` is assigned and distinct.
    #[track_caller]
    pub fn assert_ids_assigned(ids: &[EntityId]) {
        let mut seen = std::collections::HashSet::new();
        for id in ids {
            assert!(!id.is_nil(), "Identifier was not assigned");
            assert!(seen.insert(*id), "Identifier {} assigned twice", id);
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
