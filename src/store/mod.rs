pub mod cart;
pub mod wishlist;

use std::{
    sync::{
        Arc,
        atomic::{AtomicI64, Ordering},
    },
    time::Duration,
};

use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::{Mutex, RwLock, watch};

use crate::{
    middleware::auth::Session,
    models::Product,
    services::checkout::{
        CheckoutBlocked, CheckoutDeps, CheckoutInput, CheckoutOrchestrator, CheckoutState,
        SharedCart, spawn_checkout,
    },
};
use cart::{CartError, CartStore};
use wishlist::WishlistStore;

pub struct UserSession {
    pub cart: SharedCart,
    pub wishlist: RwLock<WishlistStore>,
    checkout: Arc<Mutex<CheckoutOrchestrator>>,
    checkout_state: watch::Receiver<CheckoutState>,
    last_seen_ms: AtomicI64,
}

impl UserSession {
    pub fn new(deps: CheckoutDeps) -> Self {
        let cart: SharedCart = Arc::new(RwLock::new(CartStore::new()));
        let orchestrator = CheckoutOrchestrator::new(deps, cart.clone());
        let checkout_state = orchestrator.subscribe();

        Self {
            cart,
            wishlist: RwLock::new(WishlistStore::new()),
            checkout: Arc::new(Mutex::new(orchestrator)),
            checkout_state,
            last_seen_ms: AtomicI64::new(Utc::now().timestamp_millis()),
        }
    }

    fn touch(&self) {
        self.last_seen_ms
            .store(Utc::now().timestamp_millis(), Ordering::Relaxed);
    }

    fn idle_since(&self, cutoff_ms: i64) -> bool {
        self.last_seen_ms.load(Ordering::Relaxed) < cutoff_ms
    }

    pub fn checkout_state(&self) -> CheckoutState {
        self.checkout_state.borrow().clone()
    }

    pub fn watch_checkout(&self) -> watch::Receiver<CheckoutState> {
        self.checkout_state.clone()
    }

    /// Only one attempt per shopper runs at a time.
    pub async fn start_checkout(
        &self,
        session: Session,
        input: CheckoutInput,
    ) -> Result<CheckoutState, CheckoutBlocked> {
        let mut orchestrator = self
            .checkout
            .clone()
            .try_lock_owned()
            .map_err(|_| CheckoutBlocked::InProgress)?;

        orchestrator.begin(Some(&session)).await?;
        let started = orchestrator.state();
        spawn_checkout(orchestrator, session, input);
        Ok(started)
    }

    /// The product stays saved when the cart refuses it.
    pub async fn move_to_cart(&self, product_id: &str) -> Result<Option<Product>, CartError> {
        let mut wishlist = self.wishlist.write().await;
        let Some(product) = wishlist.get(product_id).cloned() else {
            return Ok(None);
        };
        self.cart.write().await.add_to_cart(product.clone())?;
        wishlist.remove_from_wishlist(product_id);
        Ok(Some(product))
    }
}

pub struct SessionRegistry {
    sessions: DashMap<String, Arc<UserSession>>,
    deps: CheckoutDeps,
}

impl SessionRegistry {
    pub fn new(deps: CheckoutDeps) -> Self {
        Self {
            sessions: DashMap::new(),
            deps,
        }
    }

    pub fn session(&self, user_id: &str) -> Arc<UserSession> {
        let session = self
            .sessions
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(UserSession::new(self.deps.clone())))
            .value()
            .clone();
        session.touch();
        session
    }

    /// Drop shoppers not seen for `max_idle`. Sessions with a checkout in
    /// flight, or still held by a request, are kept. Returns how many went.
    pub fn evict_idle(&self, max_idle: Duration) -> usize {
        let max_idle_ms = i64::try_from(max_idle.as_millis()).unwrap_or(i64::MAX);
        let cutoff_ms = Utc::now().timestamp_millis().saturating_sub(max_idle_ms);
        let before = self.sessions.len();

        self.sessions.retain(|_, session| {
            !session.idle_since(cutoff_ms)
                || session.checkout_state().is_in_flight()
                || Arc::strong_count(session) > 1
        });

        let evicted = before.saturating_sub(self.sessions.len());
        if evicted > 0 {
            tracing::debug!(evicted, remaining = self.sessions.len(), "idle sessions evicted");
        }
        evicted
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
