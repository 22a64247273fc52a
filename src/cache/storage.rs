use axum::{
    body::Bytes,
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use dashmap::DashMap;

use super::{DYNAMIC_CACHE, STATIC_CACHE};

#[derive(Debug, Clone)]
pub struct CachedResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl CachedResponse {
    pub fn new(status: StatusCode, headers: HeaderMap, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    pub fn synthesized(status: StatusCode, text: &'static str) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        Self::new(status, headers, Bytes::from_static(text.as_bytes()))
    }

    pub fn is_ok(&self) -> bool {
        self.status == StatusCode::OK
    }
}

impl IntoResponse for CachedResponse {
    fn into_response(self) -> Response {
        (self.status, self.headers, self.body).into_response()
    }
}

#[derive(Debug, Default)]
pub struct CacheStorage {
    caches: DashMap<String, DashMap<String, CachedResponse>>,
}

impl CacheStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, cache: &str, key: &str, response: CachedResponse) {
        self.caches
            .entry(cache.to_string())
            .or_default()
            .insert(key.to_string(), response);
    }

    pub fn put_all(&self, cache: &str, entries: Vec<(String, CachedResponse)>) {
        let target = self.caches.entry(cache.to_string()).or_default();
        for (key, response) in entries {
            target.insert(key, response);
        }
    }

    /// Look the key up in every cache, the current generation first.
    pub fn lookup(&self, key: &str) -> Option<CachedResponse> {
        self.cache_containing(key).and_then(|name| {
            self.caches
                .get(&name)
                .and_then(|cache| cache.get(key).map(|entry| entry.value().clone()))
        })
    }

    pub fn cache_containing(&self, key: &str) -> Option<String> {
        for name in [STATIC_CACHE, DYNAMIC_CACHE] {
            if self
                .caches
                .get(name)
                .is_some_and(|cache| cache.contains_key(key))
            {
                return Some(name.to_string());
            }
        }

        self.caches
            .iter()
            .find(|cache| cache.value().contains_key(key))
            .map(|cache| cache.key().clone())
    }

    pub fn cache_names(&self) -> Vec<String> {
        self.caches.iter().map(|cache| cache.key().clone()).collect()
    }

    pub fn delete(&self, cache: &str) -> bool {
        self.caches.remove(cache).is_some()
    }

    pub fn len(&self, cache: &str) -> usize {
        self.caches.get(cache).map_or(0, |cache| cache.len())
    }
}
