use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use utoipa::ToSchema;

pub const MERCHANT_NAME: &str = "Allure Art";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PaymentRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// Amount in minor units, as echoed by the backend.
    pub amount: i64,
    pub currency: String,
    pub name: String,
    pub description: String,
    /// Gateway handle issued at order creation.
    pub order_id: String,
    pub prefill: PaymentPrefill,
    pub notes: PaymentNotes,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PaymentPrefill {
    pub name: String,
    pub contact: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PaymentNotes {
    pub address: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PaymentProof {
    pub razorpay_order_id: String,
    pub razorpay_payment_id: String,
    pub razorpay_signature: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WidgetOutcome {
    Success(PaymentProof),
    Dismissed,
    InitFailed(String),
}

#[async_trait]
pub trait PaymentWidget: Send + Sync {
    /// Called before the request is shown to the shopper.
    fn prepare(&self, _request: &PaymentRequest) {}

    async fn collect(&self, request: &PaymentRequest) -> WidgetOutcome;
}

type Pending = DashMap<String, oneshot::Sender<WidgetOutcome>>;

#[derive(Default)]
pub struct HostedPaymentWidget {
    pending: Pending,
    prepared: DashMap<String, oneshot::Receiver<WidgetOutcome>>,
}

impl HostedPaymentWidget {
    pub fn new() -> Self {
        Self::default()
    }

    /// False when nothing waits on the handle, including for a second callback.
    pub fn resolve(&self, gateway_order_id: &str, outcome: WidgetOutcome) -> bool {
        match self.pending.remove(gateway_order_id) {
            Some((_, sender)) => sender.send(outcome).is_ok(),
            None => false,
        }
    }

    pub fn is_waiting(&self, gateway_order_id: &str) -> bool {
        self.pending.contains_key(gateway_order_id)
    }

    fn register(&self, gateway_order_id: &str) -> oneshot::Receiver<WidgetOutcome> {
        let (tx, rx) = oneshot::channel();
        self.pending.insert(gateway_order_id.to_string(), tx);
        rx
    }
}

struct PendingGuard<'a> {
    pending: &'a Pending,
    key: String,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.pending.remove(&self.key);
    }
}

#[async_trait]
impl PaymentWidget for HostedPaymentWidget {
    fn prepare(&self, request: &PaymentRequest) {
        let rx = self.register(&request.order_id);
        self.prepared.insert(request.order_id.clone(), rx);
    }

    async fn collect(&self, request: &PaymentRequest) -> WidgetOutcome {
        let rx = match self.prepared.remove(&request.order_id) {
            Some((_, rx)) => rx,
            None => self.register(&request.order_id),
        };
        let _guard = PendingGuard {
            pending: &self.pending,
            key: request.order_id.clone(),
        };

        match rx.await {
            Ok(outcome) => outcome,
            Err(_) => WidgetOutcome::InitFailed("payment session closed".into()),
        }
    }
}
