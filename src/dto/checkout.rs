use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    models::AddressForm,
    services::{
        checkout::CheckoutInput,
        payment::{PaymentProof, WidgetOutcome},
    },
};

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct CheckoutRequest {
    pub billing: AddressForm,
    #[serde(default)]
    pub shipping: Option<AddressForm>,
    #[serde(default = "same_as_billing_default")]
    pub same_as_billing: bool,
}

fn same_as_billing_default() -> bool {
    true
}

impl From<CheckoutRequest> for CheckoutInput {
    fn from(request: CheckoutRequest) -> Self {
        Self {
            billing: request.billing,
            shipping: request.shipping,
            same_as_billing: request.same_as_billing,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PaymentCallback {
    Success(PaymentProof),
    Dismissed,
    Failed { reason: String },
}

impl From<PaymentCallback> for WidgetOutcome {
    fn from(callback: PaymentCallback) -> Self {
        match callback {
            PaymentCallback::Success(proof) => WidgetOutcome::Success(proof),
            PaymentCallback::Dismissed => WidgetOutcome::Dismissed,
            PaymentCallback::Failed { reason } => WidgetOutcome::InitFailed(reason),
        }
    }
}
