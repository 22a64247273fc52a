mod fetcher;
mod storage;

use std::sync::Arc;

use axum::{
    body::Bytes,
    http::{HeaderMap, Method, StatusCode, Uri, header},
};

pub use fetcher::{FetchError, Fetcher, HttpFetcher};
pub use storage::{CacheStorage, CachedResponse};

pub const STATIC_CACHE: &str = "allure-art-static-v1";
pub const DYNAMIC_CACHE: &str = "allure-art-dynamic-v1";

pub const STATIC_ASSETS: &[&str] = &[
    "/",
    "/gallery",
    "/artists",
    "/about",
    "/contact",
    "/wishlist",
    "/login",
    "/static/js/bundle.js",
    "/static/css/main.css",
    "/manifest.json",
    "/favicon.ico",
    "/favicon-16x16.png",
    "/favicon-32x32.png",
    "/android-chrome-192x192.png",
    "/android-chrome-512x512.png",
    "/apple-touch-icon.png",
];

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp", "avif", "svg", "ico"];
const FONT_EXTENSIONS: &[&str] = &["woff", "woff2", "ttf", "otf", "eot"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    Document,
    Image,
    Font,
    Other,
}

#[derive(Debug, Clone)]
pub struct AssetRequest {
    pub method: Method,
    pub path: String,
    pub navigate: bool,
    pub destination: Destination,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl AssetRequest {
    pub fn get(path: &str) -> Self {
        let destination = destination_from_path(path);
        Self {
            method: Method::GET,
            path: path.to_string(),
            navigate: false,
            destination,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    pub fn navigation(path: &str) -> Self {
        Self {
            navigate: true,
            destination: Destination::Document,
            ..Self::get(path)
        }
    }

    pub fn from_parts(method: Method, uri: &Uri, headers: HeaderMap, body: Bytes) -> Self {
        let path = uri
            .path_and_query()
            .map_or_else(|| uri.path().to_string(), |pq| pq.as_str().to_string());

        let header_str = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());
        let navigate = match header_str("sec-fetch-mode") {
            Some(mode) => mode == "navigate",
            None => {
                method == Method::GET
                    && header_str(header::ACCEPT.as_str()).is_some_and(|a| a.contains("text/html"))
            }
        };
        let destination = match header_str("sec-fetch-dest") {
            Some("document") => Destination::Document,
            Some("image") => Destination::Image,
            Some("font") => Destination::Font,
            _ if navigate => Destination::Document,
            _ => destination_from_path(&path),
        };

        Self {
            method,
            path,
            navigate,
            destination,
            headers,
            body,
        }
    }

    pub fn pathname(&self) -> &str {
        self.path.split('?').next().unwrap_or(&self.path)
    }
}

fn destination_from_path(path: &str) -> Destination {
    let pathname = path.split('?').next().unwrap_or(path);
    let extension = pathname
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    if IMAGE_EXTENSIONS.contains(&extension.as_str()) {
        Destination::Image
    } else if FONT_EXTENSIONS.contains(&extension.as_str()) {
        Destination::Font
    } else {
        Destination::Other
    }
}

pub struct SyncCache {
    storage: Arc<CacheStorage>,
    fetcher: Arc<dyn Fetcher>,
    manifest: Vec<String>,
}

impl SyncCache {
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self::with_manifest(fetcher, STATIC_ASSETS.iter().map(|p| p.to_string()).collect())
    }

    pub fn with_manifest(fetcher: Arc<dyn Fetcher>, manifest: Vec<String>) -> Self {
        Self {
            storage: Arc::new(CacheStorage::new()),
            fetcher,
            manifest,
        }
    }

    pub fn storage(&self) -> &CacheStorage {
        &self.storage
    }

    /// All-or-nothing: a failed manifest entry leaves the cache untouched.
    pub async fn install(&self) -> bool {
        tracing::info!(assets = self.manifest.len(), "installing static cache");
        let mut entries = Vec::with_capacity(self.manifest.len());

        for path in &self.manifest {
            match self.fetcher.fetch(&AssetRequest::get(path)).await {
                Ok(response) if response.is_ok() => entries.push((path.clone(), response)),
                Ok(response) => {
                    tracing::error!(path = %path, status = %response.status, "static cache install failed");
                    return false;
                }
                Err(err) => {
                    tracing::error!(path = %path, error = %err, "static cache install failed");
                    return false;
                }
            }
        }

        self.storage.put_all(STATIC_CACHE, entries);
        tracing::info!("static cache installed");
        true
    }

    pub fn activate(&self) -> Vec<String> {
        let stale: Vec<String> = self
            .storage
            .cache_names()
            .into_iter()
            .filter(|name| name != STATIC_CACHE && name != DYNAMIC_CACHE)
            .collect();

        for name in &stale {
            tracing::info!(cache = %name, "deleting old cache");
            self.storage.delete(name);
        }
        stale
    }

    pub async fn handle(&self, request: AssetRequest) -> CachedResponse {
        if request.method != Method::GET {
            return match self.fetcher.fetch(&request).await {
                Ok(response) => response,
                Err(err) => {
                    tracing::warn!(path = %request.path, error = %err, "passthrough fetch failed");
                    CachedResponse::synthesized(StatusCode::BAD_GATEWAY, "Bad Gateway")
                }
            };
        }

        if request.navigate {
            self.navigate(request).await
        } else {
            self.resource(request).await
        }
    }

    async fn navigate(&self, request: AssetRequest) -> CachedResponse {
        if let Some(cached) = self.storage.lookup(&request.path) {
            return cached;
        }

        match self.fetcher.fetch(&request).await {
            Ok(response) => {
                if response.is_ok() {
                    self.storage.put(DYNAMIC_CACHE, &request.path, response.clone());
                }
                response
            }
            Err(err) => {
                tracing::warn!(path = %request.path, error = %err, "navigation fetch failed, serving offline shell");
                self.storage.lookup("/").unwrap_or_else(|| {
                    CachedResponse::synthesized(
                        StatusCode::SERVICE_UNAVAILABLE,
                        "Offline - Please check your connection",
                    )
                })
            }
        }
    }

    async fn resource(&self, request: AssetRequest) -> CachedResponse {
        if let Some(cached) = self.storage.lookup(&request.path) {
            if !matches!(request.destination, Destination::Image | Destination::Font) {
                self.refresh_in_background(request);
            }
            return cached;
        }

        match self.fetcher.fetch(&request).await {
            Ok(response) => {
                if response.is_ok() {
                    let cache = if self.manifest.iter().any(|p| p == request.pathname()) {
                        STATIC_CACHE
                    } else {
                        DYNAMIC_CACHE
                    };
                    self.storage.put(cache, &request.path, response.clone());
                }
                response
            }
            Err(err) => {
                tracing::warn!(path = %request.path, error = %err, "fetch failed");
                if request.destination == Destination::Image {
                    CachedResponse::synthesized(StatusCode::NOT_FOUND, "")
                } else {
                    CachedResponse::synthesized(StatusCode::BAD_GATEWAY, "Bad Gateway")
                }
            }
        }
    }

    fn refresh_in_background(&self, request: AssetRequest) {
        let storage = self.storage.clone();
        let fetcher = self.fetcher.clone();

        tokio::spawn(async move {
            match fetcher.fetch(&request).await {
                Ok(response) if response.is_ok() => {
                    let cache = storage
                        .cache_containing(&request.path)
                        .unwrap_or_else(|| DYNAMIC_CACHE.to_string());
                    storage.put(&cache, &request.path, response);
                }
                Ok(_) => {}
                Err(err) => tracing::debug!(path = %request.path, error = %err, "background refresh failed"),
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    };
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;

    #[derive(Default)]
    struct FakeOrigin {
        offline: AtomicBool,
        calls: AtomicUsize,
        bodies: Mutex<std::collections::HashMap<String, &'static str>>,
    }

    impl FakeOrigin {
        fn serve(&self, path: &str, body: &'static str) {
            self.bodies.lock().unwrap().insert(path.to_string(), body);
        }
    }

    #[async_trait]
    impl Fetcher for FakeOrigin {
        async fn fetch(&self, request: &AssetRequest) -> Result<CachedResponse, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.offline.load(Ordering::SeqCst) {
                return Err(FetchError::Network("offline".into()));
            }
            match self.bodies.lock().unwrap().get(&request.path) {
                Some(body) => Ok(CachedResponse::new(StatusCode::OK, HeaderMap::new(), *body)),
                None => Ok(CachedResponse::synthesized(StatusCode::NOT_FOUND, "missing")),
            }
        }
    }

    fn cache_with(origin: &Arc<FakeOrigin>, manifest: &[&str]) -> SyncCache {
        SyncCache::with_manifest(
            origin.clone(),
            manifest.iter().map(|p| p.to_string()).collect(),
        )
    }

    #[tokio::test]
    async fn install_is_all_or_nothing() {
        let origin = Arc::new(FakeOrigin::default());
        origin.serve("/", "<html>shell</html>");
        let cache = cache_with(&origin, &["/", "/missing.css"]);

        assert!(!cache.install().await);
        assert_eq!(cache.storage().len(STATIC_CACHE), 0);

        origin.serve("/missing.css", "body{}");
        assert!(cache.install().await);
        assert_eq!(cache.storage().len(STATIC_CACHE), 2);
    }

    #[tokio::test]
    async fn activate_sweeps_other_generations() {
        let origin = Arc::new(FakeOrigin::default());
        let cache = cache_with(&origin, &[]);
        let entry = CachedResponse::synthesized(StatusCode::OK, "x");
        cache.storage().put("allure-art-static-v0", "/", entry.clone());
        cache.storage().put(STATIC_CACHE, "/", entry.clone());
        cache.storage().put(DYNAMIC_CACHE, "/gallery", entry);

        let deleted = cache.activate();

        assert_eq!(deleted, vec!["allure-art-static-v0".to_string()]);
        let mut names = cache.storage().cache_names();
        names.sort();
        assert_eq!(names, vec![DYNAMIC_CACHE.to_string(), STATIC_CACHE.to_string()]);
    }

    #[tokio::test]
    async fn navigation_falls_back_to_shell_then_503() {
        let origin = Arc::new(FakeOrigin::default());
        origin.offline.store(true, Ordering::SeqCst);
        let cache = cache_with(&origin, &[]);

        let response = cache.handle(AssetRequest::navigation("/artists")).await;
        assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);

        cache
            .storage()
            .put(STATIC_CACHE, "/", CachedResponse::synthesized(StatusCode::OK, "shell"));
        let response = cache.handle(AssetRequest::navigation("/artists")).await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.body, Bytes::from_static(b"shell"));
    }

    #[tokio::test]
    async fn navigation_is_cache_first_and_stores_successes() {
        let origin = Arc::new(FakeOrigin::default());
        origin.serve("/gallery", "gallery v1");
        let cache = cache_with(&origin, &[]);

        cache.handle(AssetRequest::navigation("/gallery")).await;
        origin.serve("/gallery", "gallery v2");
        let second = cache.handle(AssetRequest::navigation("/gallery")).await;

        assert_eq!(second.body, Bytes::from_static(b"gallery v1"));
        assert_eq!(origin.calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.storage().len(DYNAMIC_CACHE), 1);
    }

    #[tokio::test]
    async fn cached_resource_is_served_then_refreshed() {
        let origin = Arc::new(FakeOrigin::default());
        origin.serve("/api/artists.json", "v1");
        let cache = cache_with(&origin, &[]);

        cache.handle(AssetRequest::get("/api/artists.json")).await;
        origin.serve("/api/artists.json", "v2");

        let served = cache.handle(AssetRequest::get("/api/artists.json")).await;
        assert_eq!(served.body, Bytes::from_static(b"v1"));

        for _ in 0..50 {
            let current = cache.storage().lookup("/api/artists.json").map(|r| r.body);
            if current == Some(Bytes::from_static(b"v2")) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("cache was not refreshed in the background");
    }

    #[tokio::test]
    async fn cached_images_are_not_refreshed() {
        let origin = Arc::new(FakeOrigin::default());
        origin.serve("/images/lotus.webp", "img");
        let cache = cache_with(&origin, &[]);

        cache.handle(AssetRequest::get("/images/lotus.webp")).await;
        cache.handle(AssetRequest::get("/images/lotus.webp")).await;
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(origin.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_image_fetch_becomes_empty_404_and_others_502() {
        let origin = Arc::new(FakeOrigin::default());
        origin.offline.store(true, Ordering::SeqCst);
        let cache = cache_with(&origin, &[]);

        let image = cache.handle(AssetRequest::get("/images/missing.png")).await;
        assert_eq!(image.status, StatusCode::NOT_FOUND);
        assert!(image.body.is_empty());

        let script = cache.handle(AssetRequest::get("/static/js/chunk.js")).await;
        assert_eq!(script.status, StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn manifest_paths_land_in_static_cache_and_non_get_bypasses() {
        let origin = Arc::new(FakeOrigin::default());
        origin.serve("/manifest.json", "{}");
        let cache = cache_with(&origin, &["/manifest.json"]);

        cache.handle(AssetRequest::get("/manifest.json")).await;
        assert_eq!(cache.storage().len(STATIC_CACHE), 1);

        let post = AssetRequest {
            method: Method::POST,
            ..AssetRequest::get("/manifest.json")
        };
        cache.handle(post).await;
        assert_eq!(origin.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn classifies_requests_from_fetch_metadata_and_extension() {
        let mut headers = HeaderMap::new();
        headers.insert("sec-fetch-mode", "navigate".parse().unwrap());
        let uri: Uri = "/gallery?sort=price".parse().unwrap();
        let nav = AssetRequest::from_parts(Method::GET, &uri, headers, Bytes::new());
        assert!(nav.navigate);
        assert_eq!(nav.destination, Destination::Document);
        assert_eq!(nav.path, "/gallery?sort=price");
        assert_eq!(nav.pathname(), "/gallery");

        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, "text/html,application/xhtml+xml".parse().unwrap());
        let uri: Uri = "/about".parse().unwrap();
        assert!(AssetRequest::from_parts(Method::GET, &uri, headers, Bytes::new()).navigate);

        let uri: Uri = "/fonts/inter.woff2".parse().unwrap();
        let font = AssetRequest::from_parts(Method::GET, &uri, HeaderMap::new(), Bytes::new());
        assert!(!font.navigate);
        assert_eq!(font.destination, Destination::Font);
    }
}
