use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use thiserror::Error;
use tracing::instrument;
use utoipa::ToSchema;

use crate::{
    middleware::auth::Credential,
    models::{DraftAddress, Order, OrderLineItem, PersistedAddress, Profile},
    services::payment::PaymentProof,
};

pub const ADDRESS_EXISTS_CODE: &str = "address_exists";

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("address already exists")]
    Duplicate,

    #[error("backend rejected the credential")]
    Unauthorized,

    #[error("backend returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("malformed backend response: {0}")]
    Malformed(String),

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

impl BackendError {
    /// A 4xx answer to a well-formed call: the backend refused what was sent.
    pub fn is_rejection(&self) -> bool {
        matches!(self, BackendError::Status { status, .. } if (400..500).contains(status))
    }
}

#[async_trait]
pub trait AddressApi: Send + Sync {
    async fn list_addresses(&self, credential: &Credential) -> Result<Vec<PersistedAddress>, BackendError>;

    async fn create_address(
        &self,
        credential: &Credential,
        address: &DraftAddress,
    ) -> Result<PersistedAddress, BackendError>;
}

#[async_trait]
pub trait OrderApi: Send + Sync {
    async fn create_order(
        &self,
        credential: &Credential,
        request: &CreateOrderRequest,
    ) -> Result<CreatedOrder, BackendError>;

    async fn verify_payment(
        &self,
        credential: &Credential,
        request: &VerifyPaymentRequest,
    ) -> Result<Order, BackendError>;

    async fn get_order(&self, credential: &Credential, order_id: &str) -> Result<Order, BackendError>;

    async fn list_orders(&self, credential: &Credential) -> Result<Vec<Order>, BackendError>;
}

#[async_trait]
pub trait ProfileApi: Send + Sync {
    async fn get_profile(&self, credential: &Credential) -> Result<Option<Profile>, BackendError>;

    async fn save_profile(&self, credential: &Credential, profile: &Profile) -> Result<Profile, BackendError>;
}

/// `amount` is a hint in minor units. The backend recomputes the charge from `items`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CreateOrderRequest {
    pub items: Vec<OrderLineItem>,
    pub amount: i64,
    pub currency: String,
    pub billing_address_id: String,
    pub shipping_address_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayOrder {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedOrder {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    #[serde(rename = "razorpayOrder")]
    pub gateway_order: GatewayOrder,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyPaymentRequest {
    pub razorpay_order_id: String,
    pub razorpay_payment_id: String,
    pub razorpay_signature: String,
    pub order_id: String,
}

impl VerifyPaymentRequest {
    pub fn new(proof: &PaymentProof, order_id: &str) -> Self {
        Self {
            razorpay_order_id: proof.razorpay_order_id.clone(),
            razorpay_payment_id: proof.razorpay_payment_id.clone(),
            razorpay_signature: proof.razorpay_signature.clone(),
            order_id: order_id.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct VerifyPaymentResponse {
    order: Order,
}

#[derive(Debug, Default, Deserialize)]
struct ProfileEnvelope {
    #[serde(default)]
    profile: Option<Profile>,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    code: Option<String>,
    error: Option<String>,
    message: Option<String>,
}

#[derive(Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base: String,
}

impl HttpBackend {
    pub fn new(base: &str, timeout: Duration) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base: base.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base, path.trim_start_matches('/'))
    }

    async fn read<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, BackendError> {
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let err = classify(status, &text);
            tracing::warn!(status = %status, error = %err, "backend call failed");
            return Err(err);
        }

        serde_json::from_str(&text).map_err(|e| BackendError::Malformed(e.to_string()))
    }
}

/// Duplicate is either `409 Conflict` or the `address_exists` code in the body.
fn classify(status: StatusCode, body: &str) -> BackendError {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();

    if status == StatusCode::CONFLICT || parsed.code.as_deref() == Some(ADDRESS_EXISTS_CODE) {
        return BackendError::Duplicate;
    }
    if status == StatusCode::UNAUTHORIZED {
        return BackendError::Unauthorized;
    }

    let message = parsed
        .error
        .or(parsed.message)
        .unwrap_or_else(|| body.chars().take(200).collect());

    BackendError::Status {
        status: status.as_u16(),
        message,
    }
}

#[async_trait]
impl AddressApi for HttpBackend {
    #[instrument(skip_all)]
    async fn list_addresses(&self, credential: &Credential) -> Result<Vec<PersistedAddress>, BackendError> {
        let response = self
            .client
            .get(self.url("api/addresses"))
            .header(reqwest::header::AUTHORIZATION, credential.header_value())
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;
        Self::read(response).await
    }

    #[instrument(skip_all, fields(address_type = %address.address_type))]
    async fn create_address(
        &self,
        credential: &Credential,
        address: &DraftAddress,
    ) -> Result<PersistedAddress, BackendError> {
        let response = self
            .client
            .post(self.url("api/addresses"))
            .header(reqwest::header::AUTHORIZATION, credential.header_value())
            .header(reqwest::header::ACCEPT, "application/json")
            .json(address)
            .send()
            .await?;
        Self::read(response).await
    }
}

#[async_trait]
impl OrderApi for HttpBackend {
    #[instrument(skip_all, fields(items = request.items.len()))]
    async fn create_order(
        &self,
        credential: &Credential,
        request: &CreateOrderRequest,
    ) -> Result<CreatedOrder, BackendError> {
        let response = self
            .client
            .post(self.url("api/orders/create-order"))
            .header(reqwest::header::AUTHORIZATION, credential.header_value())
            .json(request)
            .send()
            .await?;
        Self::read(response).await
    }

    #[instrument(skip_all, fields(order_id = %request.order_id))]
    async fn verify_payment(
        &self,
        credential: &Credential,
        request: &VerifyPaymentRequest,
    ) -> Result<Order, BackendError> {
        let response = self
            .client
            .post(self.url("api/orders/verify"))
            .header(reqwest::header::AUTHORIZATION, credential.header_value())
            .json(request)
            .send()
            .await?;
        let body: VerifyPaymentResponse = Self::read(response).await?;
        Ok(body.order)
    }

    #[instrument(skip(self, credential))]
    async fn get_order(&self, credential: &Credential, order_id: &str) -> Result<Order, BackendError> {
        let response = self
            .client
            .get(self.url(&format!("api/orders/{order_id}")))
            .header(reqwest::header::AUTHORIZATION, credential.header_value())
            .send()
            .await?;
        Self::read(response).await
    }

    #[instrument(skip_all)]
    async fn list_orders(&self, credential: &Credential) -> Result<Vec<Order>, BackendError> {
        let response = self
            .client
            .get(self.url("api/orders"))
            .header(reqwest::header::AUTHORIZATION, credential.header_value())
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;
        Self::read(response).await
    }
}

#[async_trait]
impl ProfileApi for HttpBackend {
    #[instrument(skip_all)]
    async fn get_profile(&self, credential: &Credential) -> Result<Option<Profile>, BackendError> {
        let response = self
            .client
            .get(self.url("api/profile/me"))
            .header(reqwest::header::AUTHORIZATION, credential.header_value())
            .send()
            .await?;
        let body: ProfileEnvelope = Self::read(response).await?;
        Ok(body.profile)
    }

    #[instrument(skip_all)]
    async fn save_profile(&self, credential: &Credential, profile: &Profile) -> Result<Profile, BackendError> {
        let response = self
            .client
            .post(self.url("api/profile/me"))
            .header(reqwest::header::AUTHORIZATION, credential.header_value())
            .json(profile)
            .send()
            .await?;
        let body: ProfileEnvelope = Self::read(response).await?;
        Ok(body.profile.unwrap_or_else(|| profile.clone()))
    }
}
