#![allow(dead_code)]

use std::{
    collections::VecDeque,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use allure_art_storefront::{
    config::AppConfig,
    middleware::auth::{Credential, Session},
    models::{AddressForm, DraftAddress, Order, OrderStatus, PersistedAddress, Product, Profile},
    services::{
        backend::{
            AddressApi, BackendError, CreateOrderRequest, CreatedOrder, GatewayOrder, OrderApi,
            ProfileApi, VerifyPaymentRequest,
        },
        checkout::{CheckoutDeps, CheckoutInput, CheckoutSettings},
        payment::{PaymentProof, PaymentRequest, PaymentWidget, WidgetOutcome},
    },
};
use async_trait::async_trait;
use chrono::Utc;

pub const JWT_SECRET: &str = "test-secret";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyBehaviour {
    Paid,
    Rejected(u16),
    MarkedFailed,
}

/// Scripted answer to one create call; calls past the script are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    Accept,
    Reject(u16),
}

/// In-memory stand-in for the REST backend that counts every call.
pub struct FakeBackend {
    pub address_creates: AtomicUsize,
    pub address_lists: AtomicUsize,
    pub order_creates: AtomicUsize,
    pub verifies: AtomicUsize,
    pub saved: Mutex<Vec<PersistedAddress>>,
    pub order_requests: Mutex<Vec<CreateOrderRequest>>,
    pub verify_behaviour: Mutex<VerifyBehaviour>,
    pub address_replies: Mutex<VecDeque<Reply>>,
    pub order_replies: Mutex<VecDeque<Reply>>,
    pub profile: Mutex<Option<Profile>>,
}

impl Default for FakeBackend {
    fn default() -> Self {
        Self {
            address_creates: AtomicUsize::new(0),
            address_lists: AtomicUsize::new(0),
            order_creates: AtomicUsize::new(0),
            verifies: AtomicUsize::new(0),
            saved: Mutex::new(Vec::new()),
            order_requests: Mutex::new(Vec::new()),
            verify_behaviour: Mutex::new(VerifyBehaviour::Paid),
            address_replies: Mutex::new(VecDeque::new()),
            order_replies: Mutex::new(VecDeque::new()),
            profile: Mutex::new(None),
        }
    }
}

impl FakeBackend {
    pub fn verify_with(&self, behaviour: VerifyBehaviour) {
        *self.verify_behaviour.lock().unwrap() = behaviour;
    }

    pub fn script_address_creates(&self, replies: impl IntoIterator<Item = Reply>) {
        self.address_replies.lock().unwrap().extend(replies);
    }

    pub fn script_order_creates(&self, replies: impl IntoIterator<Item = Reply>) {
        self.order_replies.lock().unwrap().extend(replies);
    }

    pub fn calls(&self) -> (usize, usize, usize, usize) {
        (
            self.address_lists.load(Ordering::SeqCst),
            self.address_creates.load(Ordering::SeqCst),
            self.order_creates.load(Ordering::SeqCst),
            self.verifies.load(Ordering::SeqCst),
        )
    }

    fn reply(script: &Mutex<VecDeque<Reply>>) -> Result<(), BackendError> {
        match script.lock().unwrap().pop_front() {
            Some(Reply::Reject(status)) => Err(BackendError::Status {
                status,
                message: "rejected".into(),
            }),
            _ => Ok(()),
        }
    }

    fn order(id: &str, status: OrderStatus) -> Order {
        Order {
            id: id.to_string(),
            status,
            amount: 200,
            currency: "INR".into(),
            billing_address_id: None,
            shipping_address_id: None,
            items: Vec::new(),
            created_at: Some(Utc::now()),
        }
    }
}

#[async_trait]
impl AddressApi for FakeBackend {
    async fn list_addresses(&self, _: &Credential) -> Result<Vec<PersistedAddress>, BackendError> {
        self.address_lists.fetch_add(1, Ordering::SeqCst);
        Ok(self.saved.lock().unwrap().clone())
    }

    async fn create_address(
        &self,
        _: &Credential,
        address: &DraftAddress,
    ) -> Result<PersistedAddress, BackendError> {
        let n = self.address_creates.fetch_add(1, Ordering::SeqCst) + 1;
        Self::reply(&self.address_replies)?;
        let created = PersistedAddress {
            id: format!("addr_{n}"),
            user_id: Some("user-1".into()),
            address: address.clone(),
        };
        self.saved.lock().unwrap().push(created.clone());
        Ok(created)
    }
}

#[async_trait]
impl OrderApi for FakeBackend {
    async fn create_order(
        &self,
        _: &Credential,
        request: &CreateOrderRequest,
    ) -> Result<CreatedOrder, BackendError> {
        let n = self.order_creates.fetch_add(1, Ordering::SeqCst) + 1;
        self.order_requests.lock().unwrap().push(request.clone());
        Self::reply(&self.order_replies)?;
        Ok(CreatedOrder {
            id: format!("ord_{n}"),
            amount: request.amount,
            currency: request.currency.clone(),
            gateway_order: GatewayOrder {
                id: format!("order_rzp_{n}"),
            },
        })
    }

    async fn verify_payment(
        &self,
        _: &Credential,
        request: &VerifyPaymentRequest,
    ) -> Result<Order, BackendError> {
        self.verifies.fetch_add(1, Ordering::SeqCst);
        match *self.verify_behaviour.lock().unwrap() {
            VerifyBehaviour::Paid => Ok(Self::order(&request.order_id, OrderStatus::Paid)),
            VerifyBehaviour::MarkedFailed => Ok(Self::order(&request.order_id, OrderStatus::Failed)),
            VerifyBehaviour::Rejected(status) => Err(BackendError::Status {
                status,
                message: "signature mismatch".into(),
            }),
        }
    }

    async fn get_order(&self, _: &Credential, order_id: &str) -> Result<Order, BackendError> {
        if order_id == "missing" {
            return Err(BackendError::Status {
                status: 404,
                message: "order not found".into(),
            });
        }
        Ok(Self::order(order_id, OrderStatus::Paid))
    }

    async fn list_orders(&self, _: &Credential) -> Result<Vec<Order>, BackendError> {
        let mut old = Self::order("ord_old", OrderStatus::Paid);
        old.created_at = Some(Utc::now() - chrono::Duration::days(2));
        let mut undated = Self::order("ord_undated", OrderStatus::Created);
        undated.created_at = None;
        let new = Self::order("ord_new", OrderStatus::PendingPayment);
        Ok(vec![old, undated, new])
    }
}

#[async_trait]
impl ProfileApi for FakeBackend {
    async fn get_profile(&self, _: &Credential) -> Result<Option<Profile>, BackendError> {
        Ok(self.profile.lock().unwrap().clone())
    }

    async fn save_profile(&self, _: &Credential, profile: &Profile) -> Result<Profile, BackendError> {
        *self.profile.lock().unwrap() = Some(profile.clone());
        Ok(profile.clone())
    }
}

#[derive(Debug, Clone)]
pub enum Step {
    Pay,
    PayForOtherOrder,
    Dismiss,
    Fail(String),
    Hang,
    Panic,
}

/// Payment widget that follows a script, paying when the script runs out.
#[derive(Default)]
pub struct ScriptedWidget {
    script: Mutex<VecDeque<Step>>,
    pub requests: Mutex<Vec<PaymentRequest>>,
}

impl ScriptedWidget {
    pub fn with_steps(steps: impl IntoIterator<Item = Step>) -> Self {
        Self {
            script: Mutex::new(steps.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        }
    }
}

pub fn proof_for(gateway_order_id: &str) -> PaymentProof {
    PaymentProof {
        razorpay_order_id: gateway_order_id.to_string(),
        razorpay_payment_id: "pay_1".into(),
        razorpay_signature: "sig".into(),
    }
}

#[async_trait]
impl PaymentWidget for ScriptedWidget {
    async fn collect(&self, request: &PaymentRequest) -> WidgetOutcome {
        self.requests.lock().unwrap().push(request.clone());
        let step = self.script.lock().unwrap().pop_front().unwrap_or(Step::Pay);
        match step {
            Step::Pay => WidgetOutcome::Success(proof_for(&request.order_id)),
            Step::PayForOtherOrder => WidgetOutcome::Success(proof_for("order_rzp_other")),
            Step::Dismiss => WidgetOutcome::Dismissed,
            Step::Fail(reason) => WidgetOutcome::InitFailed(reason),
            Step::Hang => std::future::pending().await,
            Step::Panic => panic!("widget crashed"),
        }
    }
}

pub fn product(id: &str, price: i64) -> Product {
    Product {
        id: id.to_string(),
        title: format!("Artwork {id}"),
        artist: "Meera Rao".into(),
        price,
        image: format!("/images/{id}.webp"),
        description: None,
        category: "painting".into(),
        dimensions: "24x36 in".into(),
        medium: "Oil on canvas".into(),
        year: 2021,
    }
}

pub fn form(phone: &str) -> AddressForm {
    AddressForm {
        full_name: "Asha Menon".into(),
        phone: phone.into(),
        street: "12 MG Road".into(),
        city: "Pune".into(),
        state: "Maharashtra".into(),
        postal_code: "411001".into(),
        country: "India".into(),
        is_default: true,
    }
}

pub fn same_as_billing(phone: &str) -> CheckoutInput {
    CheckoutInput {
        billing: form(phone),
        shipping: None,
        same_as_billing: true,
    }
}

pub fn session() -> Session {
    Session::new(
        "user-1",
        Some("asha@example.com".into()),
        "token",
        Utc::now() + chrono::Duration::hours(1),
    )
}

pub fn settings() -> CheckoutSettings {
    CheckoutSettings {
        currency: "INR".into(),
        payment_key_id: Some("rzp_test_key".into()),
        backend_timeout: Duration::from_secs(2),
        payment_timeout: Duration::from_secs(2),
    }
}

pub fn deps(backend: Arc<FakeBackend>, widget: Arc<dyn PaymentWidget>) -> CheckoutDeps {
    CheckoutDeps {
        addresses: backend.clone(),
        orders: backend,
        widget,
        settings: settings(),
    }
}

pub fn config() -> AppConfig {
    AppConfig {
        host: "127.0.0.1".into(),
        port: 0,
        api_base: "http://backend.invalid".into(),
        asset_origin: "http://assets.invalid".into(),
        jwt_secret: JWT_SECRET.into(),
        jwt_audience: None,
        currency: "INR".into(),
        payment_key_id: None,
        backend_timeout: Duration::from_secs(2),
        payment_timeout: Duration::from_secs(5),
        session_idle: Duration::from_secs(3600),
    }
}

/// Shell origin that serves a fixed page for every GET and echoes the method otherwise.
#[derive(Default)]
pub struct FakeOrigin {
    pub fetches: AtomicUsize,
}

#[async_trait]
impl allure_art_storefront::cache::Fetcher for FakeOrigin {
    async fn fetch(
        &self,
        request: &allure_art_storefront::cache::AssetRequest,
    ) -> Result<allure_art_storefront::cache::CachedResponse, allure_art_storefront::cache::FetchError> {
        use axum::http::{HeaderMap, StatusCode};

        self.fetches.fetch_add(1, Ordering::SeqCst);
        let body = format!("{} {}", request.method, request.path);
        Ok(allure_art_storefront::cache::CachedResponse::new(
            StatusCode::OK,
            HeaderMap::new(),
            body,
        ))
    }
}

pub fn app_state(backend: Arc<FakeBackend>) -> allure_art_storefront::state::AppState {
    allure_art_storefront::state::AppState::new(
        config(),
        backend.clone(),
        backend.clone(),
        backend,
        Arc::new(FakeOrigin::default()),
    )
}

pub fn bearer_token(user_id: &str) -> String {
    use allure_art_storefront::middleware::auth::Claims;
    use jsonwebtoken::{EncodingKey, Header, encode};

    let claims = Claims {
        sub: user_id.to_string(),
        email: Some(format!("{user_id}@example.com")),
        exp: (Utc::now() + chrono::Duration::hours(1)).timestamp() as usize,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .expect("token");
    format!("Bearer {token}")
}
