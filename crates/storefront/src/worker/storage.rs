//! Named response caches.
//!
//! A [`CacheStorage`] holds independent [`CacheNamespace`]s. Each namespace is a
//! bounded `moka` cache keyed by request (method and full URL). Namespaces are
//! never merged; each is enumerated and deleted on its own.
//!
//! One storage serves every client of the edge proxy, so requests carrying
//! credentials are keyed by a hash of those credentials as well. A response
//! stored for one `Authorization` or `Cookie` is never replayed to another;
//! responses stored without credentials are public and match anyone.

use std::collections::BTreeMap;
use std::hash::{BuildHasher, Hash, Hasher, RandomState};
use std::sync::{Arc, PoisonError, RwLock};

use axum::http::{HeaderName, Method, header};
use moka::future::Cache;
use tracing::debug;

use crate::fetch::{FetchRequest, FetchResponse};

/// All cache namespaces of one worker.
#[derive(Clone)]
pub struct CacheStorage {
    inner: Arc<StorageInner>,
}

struct StorageInner {
    capacity: u64,
    /// Seeds the credential hash; random per process.
    scope: RandomState,
    namespaces: RwLock<BTreeMap<String, CacheNamespace>>,
}

impl CacheStorage {
    /// Create an empty storage whose namespaces hold at most `capacity` entries.
    #[must_use]
    pub fn new(capacity: u64) -> Self {
        Self {
            inner: Arc::new(StorageInner {
                capacity,
                scope: RandomState::new(),
                namespaces: RwLock::new(BTreeMap::new()),
            }),
        }
    }

    /// Open a namespace, creating it if needed.
    #[must_use]
    pub fn open(&self, name: &str) -> CacheNamespace {
        if let Some(existing) = self
            .inner
            .namespaces
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
        {
            return existing.clone();
        }

        let mut namespaces = self
            .inner
            .namespaces
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        namespaces
            .entry(name.to_string())
            .or_insert_with(|| {
                debug!(namespace = name, "Opening cache namespace");
                CacheNamespace::new(name, self.inner.capacity, self.inner.scope.clone())
            })
            .clone()
    }

    /// Whether a namespace exists.
    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        self.inner
            .namespaces
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    /// Delete a namespace and every entry in it.
    pub fn delete(&self, name: &str) -> bool {
        let removed = self
            .inner
            .namespaces
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name);

        removed.is_some_and(|namespace| {
            namespace.cache.invalidate_all();
            true
        })
    }

    /// Names of all namespaces, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.inner
            .namespaces
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }
}

/// One named response cache.
#[derive(Clone)]
pub struct CacheNamespace {
    name: Arc<str>,
    cache: Cache<String, FetchResponse>,
    scope: RandomState,
}

impl std::fmt::Debug for CacheNamespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheNamespace")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl CacheNamespace {
    fn new(name: &str, capacity: u64, scope: RandomState) -> Self {
        Self {
            name: Arc::from(name),
            cache: Cache::builder().max_capacity(capacity).build(),
            scope,
        }
    }

    /// Key under which a request is stored: `"{METHOD} {url}"`, followed by
    /// ` #{hash}` when the request carries credentials.
    fn key(&self, request: &FetchRequest) -> String {
        let base = public_key(request);

        let mut hasher = self.scope.build_hasher();
        let mut credentialed = false;
        for name in &CREDENTIAL_HEADERS {
            for value in request.headers.get_all(name) {
                credentialed = true;
                name.as_str().hash(&mut hasher);
                value.as_bytes().hash(&mut hasher);
            }
        }

        if credentialed {
            format!("{base} #{:016x}", hasher.finish())
        } else {
            base
        }
    }

    /// Namespace name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Cached response for an exactly matching request.
    ///
    /// A credentialed request matches its own entry first, then the entry
    /// stored without credentials.
    pub async fn match_request(&self, request: &FetchRequest) -> Option<FetchResponse> {
        let key = self.key(request);
        if let Some(hit) = self.cache.get(&key).await {
            return Some(hit);
        }

        let public = public_key(request);
        if key == public {
            return None;
        }
        self.cache.get(&public).await
    }

    /// Store a response. Only GET requests are stored; returns whether it was.
    ///
    /// Storing is best-effort once the namespace holds `max_capacity` entries:
    /// moka's admission policy may drop the new entry instead of evicting an
    /// old one, so a later `match_request` can miss even after `true`.
    pub async fn put(&self, request: &FetchRequest, response: FetchResponse) -> bool {
        if request.method != Method::GET {
            return false;
        }
        self.cache.insert(self.key(request), response).await;
        true
    }

    /// Remove the entry stored under `key`.
    pub async fn delete(&self, key: &str) -> bool {
        self.cache.remove(key).await.is_some()
    }

    /// Snapshot of every entry.
    #[must_use]
    pub fn entries(&self) -> Vec<(String, FetchResponse)> {
        self.cache
            .iter()
            .map(|(key, response)| ((*key).clone(), response))
            .collect()
    }

    /// Keys of every entry, sorted.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.cache.iter().map(|(key, _)| (*key).clone()).collect();
        keys.sort();
        keys
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cache.iter().count()
    }

    /// Whether the namespace is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cache.iter().next().is_none()
    }
}

fn public_key(request: &FetchRequest) -> String {
    format!("{} {}", request.method, request.url)
}

/// Request headers that identify a user.
static CREDENTIAL_HEADERS: [HeaderName; 2] = [header::AUTHORIZATION, header::COOKIE];

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::{HeaderMap, HeaderValue, StatusCode};
    use url::Url;

    use super::*;

    fn get(path: &str) -> FetchRequest {
        FetchRequest::get(Url::parse("https://shop.test").unwrap().join(path).unwrap())
    }

    fn ok(body: &'static str) -> FetchResponse {
        FetchResponse::new(StatusCode::OK, HeaderMap::new(), body)
    }

    #[tokio::test]
    async fn test_put_and_match() {
        let storage = CacheStorage::new(10);
        let ns = storage.open("bazaar-static-v1");

        assert!(ns.put(&get("/app.js"), ok("js")).await);
        let hit = ns.match_request(&get("/app.js")).await.unwrap();
        assert_eq!(hit.body, "js");
        assert!(ns.match_request(&get("/other.js")).await.is_none());
        assert_eq!(ns.keys(), ["GET https://shop.test/app.js"]);
    }

    #[tokio::test]
    async fn test_only_get_is_stored() {
        let storage = CacheStorage::new(10);
        let ns = storage.open("bazaar-dynamic-v1");
        let post = FetchRequest::new(Method::POST, get("/api/cart").url);

        assert!(!ns.put(&post, ok("{}")).await);
        assert!(ns.match_request(&post).await.is_none());
        assert!(ns.is_empty());
    }

    #[tokio::test]
    async fn test_open_returns_same_namespace() {
        let storage = CacheStorage::new(10);
        storage.open("a").put(&get("/x"), ok("x")).await;

        assert!(storage.open("a").match_request(&get("/x")).await.is_some());
        assert!(storage.open("b").match_request(&get("/x")).await.is_none());
        assert_eq!(storage.names(), ["a", "b"]);
    }

    #[tokio::test]
    async fn test_delete_namespace() {
        let storage = CacheStorage::new(10);
        let ns = storage.open("old");
        ns.put(&get("/x"), ok("x")).await;

        assert!(storage.delete("old"));
        assert!(!storage.has("old"));
        assert!(!storage.delete("old"));
        assert!(storage.open("old").is_empty());
    }

    #[tokio::test]
    async fn test_delete_entry() {
        let storage = CacheStorage::new(10);
        let ns = storage.open("images");
        ns.put(&get("/a.png"), ok("a")).await;
        ns.put(&get("/b.png"), ok("b")).await;

        assert!(ns.delete("GET https://shop.test/a.png").await);
        assert_eq!(ns.len(), 1);
        assert!(!ns.delete("GET https://shop.test/a.png").await);
    }

    #[tokio::test]
    async fn test_credentialed_entries_are_scoped_to_their_credentials() {
        let storage = CacheStorage::new(10);
        let ns = storage.open("bazaar-dynamic-v1");
        let as_user = |token: &'static str| {
            get("/rest/v1/orders").with_header(header::AUTHORIZATION, HeaderValue::from_static(token))
        };

        assert!(ns.put(&as_user("Bearer alice"), ok("alice-order")).await);

        let hit = ns.match_request(&as_user("Bearer alice")).await.unwrap();
        assert_eq!(hit.body, "alice-order");
        assert!(ns.match_request(&as_user("Bearer bob")).await.is_none());
        assert!(ns.match_request(&get("/rest/v1/orders")).await.is_none());

        let cookie = get("/rest/v1/orders")
            .with_header(header::COOKIE, HeaderValue::from_static("session=alice"));
        assert!(ns.match_request(&cookie).await.is_none());

        let key = ns.keys().pop().unwrap();
        assert!(key.starts_with("GET https://shop.test/rest/v1/orders #"));
        assert!(!key.contains("alice"));
    }

    #[tokio::test]
    async fn test_public_entry_serves_credentialed_request() {
        let storage = CacheStorage::new(10);
        let ns = storage.open("bazaar-static-v1");
        ns.put(&get("/manifest.json"), ok("public")).await;

        let credentialed = get("/manifest.json")
            .with_header(header::COOKIE, HeaderValue::from_static("session=bob"));
        let hit = ns.match_request(&credentialed).await.unwrap();
        assert_eq!(hit.body, "public");
    }
}
