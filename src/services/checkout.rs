use std::{sync::Arc, time::Duration};

use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use tokio::{
    sync::{OwnedMutexGuard, RwLock, watch},
    task::JoinHandle,
    time::timeout,
};
use tracing::instrument;
use utoipa::ToSchema;

use crate::{
    audit::log_audit,
    middleware::auth::{Credential, Session},
    models::{
        AddressForm, AddressType, DraftAddress, MINOR_UNITS_PER_MAJOR, Order, OrderStatus,
        PersistedAddress,
    },
    services::{
        address_resolver::{AddressResolver, FieldError, ResolveError, validate_address},
        backend::{AddressApi, CreateOrderRequest, CreatedOrder, OrderApi, VerifyPaymentRequest},
        payment::{
            MERCHANT_NAME, PaymentNotes, PaymentPrefill, PaymentProof, PaymentRequest,
            PaymentWidget, WidgetOutcome,
        },
    },
    store::cart::CartStore,
};

pub type SharedCart = Arc<RwLock<CartStore>>;

#[derive(Debug, Clone)]
pub struct CheckoutSettings {
    pub currency: String,
    pub payment_key_id: Option<String>,
    pub backend_timeout: Duration,
    pub payment_timeout: Duration,
}

#[derive(Clone)]
pub struct CheckoutDeps {
    pub addresses: Arc<dyn AddressApi>,
    pub orders: Arc<dyn OrderApi>,
    pub widget: Arc<dyn PaymentWidget>,
    pub settings: CheckoutSettings,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutInput {
    pub billing: AddressForm,
    pub shipping: Option<AddressForm>,
    pub same_as_billing: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutStage {
    ValidatingInput,
    ResolvingAddresses,
    CreatingOrder,
    AwaitingPayment,
    VerifyingPayment,
}

impl std::fmt::Display for CheckoutStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let stage = match self {
            CheckoutStage::ValidatingInput => "validating input",
            CheckoutStage::ResolvingAddresses => "saving addresses",
            CheckoutStage::CreatingOrder => "creating the order",
            CheckoutStage::AwaitingPayment => "waiting for payment",
            CheckoutStage::VerifyingPayment => "verifying payment",
        };
        f.write_str(stage)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema, Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CheckoutFailure {
    #[error("please correct the highlighted address fields")]
    Validation { errors: Vec<FieldError> },

    #[error("could not save the {address_type} address: {message}")]
    AddressResolution {
        address_type: AddressType,
        message: String,
    },

    #[error("could not create the order: {message}")]
    OrderCreation { message: String },

    #[error("the payment gateway is unavailable: {message}")]
    PaymentGatewayUnavailable { message: String },

    #[error("payment for order {order_id} could not be verified, please contact support: {message}")]
    Verification { order_id: String, message: String },

    #[error("checkout timed out while {stage}")]
    Timeout {
        stage: CheckoutStage,
        order_id: Option<String>,
    },

    #[error("checkout failed unexpectedly: {message}")]
    Unknown { message: String },
}

impl CheckoutFailure {
    pub fn order_id(&self) -> Option<&str> {
        match self {
            CheckoutFailure::Verification { order_id, .. } => Some(order_id),
            CheckoutFailure::Timeout { order_id, .. } => order_id.as_deref(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CheckoutState {
    Idle,
    ValidatingInput,
    ResolvingAddresses,
    CreatingOrder,
    AwaitingPayment {
        order_id: String,
        payment: PaymentRequest,
    },
    VerifyingPayment {
        order_id: String,
    },
    Completed {
        order_id: String,
        order: Order,
    },
    Failed {
        error: CheckoutFailure,
    },
    Cancelled {
        order_id: String,
    },
}

impl CheckoutState {
    pub fn is_in_flight(&self) -> bool {
        matches!(
            self,
            CheckoutState::ValidatingInput
                | CheckoutState::ResolvingAddresses
                | CheckoutState::CreatingOrder
                | CheckoutState::AwaitingPayment { .. }
                | CheckoutState::VerifyingPayment { .. }
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            CheckoutState::Idle => "idle",
            CheckoutState::ValidatingInput => "validating_input",
            CheckoutState::ResolvingAddresses => "resolving_addresses",
            CheckoutState::CreatingOrder => "creating_order",
            CheckoutState::AwaitingPayment { .. } => "awaiting_payment",
            CheckoutState::VerifyingPayment { .. } => "verifying_payment",
            CheckoutState::Completed { .. } => "completed",
            CheckoutState::Failed { .. } => "failed",
            CheckoutState::Cancelled { .. } => "cancelled",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CheckoutBlocked {
    #[error("sign in to continue to checkout")]
    AuthenticationRequired,

    #[error("your cart is empty")]
    CartEmpty,

    #[error("a checkout is already in progress")]
    InProgress,
}

struct PreparedAddresses {
    input: CheckoutInput,
    billing: DraftAddress,
    billing_id: String,
    shipping_id: String,
}

pub struct CheckoutOrchestrator {
    deps: CheckoutDeps,
    cart: SharedCart,
    saved_addresses: Option<Vec<PersistedAddress>>,
    prepared: Option<PreparedAddresses>,
    state: Arc<watch::Sender<CheckoutState>>,
}

impl CheckoutOrchestrator {
    pub fn new(deps: CheckoutDeps, cart: SharedCart) -> Self {
        let (state, _) = watch::channel(CheckoutState::Idle);
        Self {
            deps,
            cart,
            saved_addresses: None,
            prepared: None,
            state: Arc::new(state),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<CheckoutState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> CheckoutState {
        self.state.borrow().clone()
    }

    pub fn saved_addresses(&self) -> &[PersistedAddress] {
        self.saved_addresses.as_deref().unwrap_or_default()
    }

    pub async fn begin<'s>(&mut self, session: Option<&'s Session>) -> Result<&'s Session, CheckoutBlocked> {
        if self.state.borrow().is_in_flight() {
            return Err(CheckoutBlocked::InProgress);
        }
        let Some(session) = session.filter(|s| !s.is_expired(Utc::now())) else {
            return Err(CheckoutBlocked::AuthenticationRequired);
        };
        if self.cart.read().await.is_empty() {
            return Err(CheckoutBlocked::CartEmpty);
        }

        self.transition(CheckoutState::ValidatingInput);
        Ok(session)
    }

    pub async fn checkout(
        &mut self,
        session: Option<&Session>,
        input: CheckoutInput,
    ) -> Result<CheckoutState, CheckoutBlocked> {
        let session = self.begin(session).await?;
        Ok(self.run(session, input).await)
    }

    #[instrument(skip_all, fields(user_id = %session.user_id))]
    pub async fn run(&mut self, session: &Session, input: CheckoutInput) -> CheckoutState {
        let terminal = match self.drive(session, input).await {
            Ok(state) => state,
            Err(error) => {
                tracing::warn!(error = %error, "checkout failed");
                CheckoutState::Failed { error }
            }
        };
        self.transition(terminal.clone());
        terminal
    }

    async fn drive(&mut self, session: &Session, input: CheckoutInput) -> Result<CheckoutState, CheckoutFailure> {
        let credential = session.credential();

        let reusable = self.prepared.as_ref().filter(|prepared| prepared.input == input);
        let (billing, billing_id, shipping_id) = match reusable {
            Some(prepared) => {
                tracing::debug!("reusing addresses resolved by the previous attempt");
                (
                    prepared.billing.clone(),
                    prepared.billing_id.clone(),
                    prepared.shipping_id.clone(),
                )
            }
            None => {
                let (billing, shipping) = validate_input(&input)?;

                self.transition(CheckoutState::ResolvingAddresses);
                // Billing first: identical shipping content may reuse what billing saved.
                let billing_id = self.resolve(&billing, &credential).await?;
                let shipping_id = self.resolve(&shipping, &credential).await?;

                self.prepared = Some(PreparedAddresses {
                    input,
                    billing: billing.clone(),
                    billing_id: billing_id.clone(),
                    shipping_id: shipping_id.clone(),
                });
                (billing, billing_id, shipping_id)
            }
        };

        self.transition(CheckoutState::CreatingOrder);
        let created = self.create_order(&credential, billing_id, shipping_id).await?;
        log_audit(
            &session.user_id,
            "order_created",
            Some("orders"),
            Some(serde_json::json!({ "order_id": created.id, "amount": created.amount })),
        );

        let payment = self.payment_request(session, &billing, &created);
        self.deps.widget.prepare(&payment);
        self.transition(CheckoutState::AwaitingPayment {
            order_id: created.id.clone(),
            payment: payment.clone(),
        });

        let proof = match timeout(self.deps.settings.payment_timeout, self.deps.widget.collect(&payment)).await {
            Ok(WidgetOutcome::Success(proof)) => proof,
            Ok(WidgetOutcome::Dismissed) => {
                tracing::info!(order_id = %created.id, "payment dismissed by shopper");
                return Ok(CheckoutState::Cancelled {
                    order_id: created.id,
                });
            }
            Ok(WidgetOutcome::InitFailed(message)) => {
                return Err(CheckoutFailure::PaymentGatewayUnavailable { message });
            }
            Err(_) => {
                return Err(CheckoutFailure::Timeout {
                    stage: CheckoutStage::AwaitingPayment,
                    order_id: Some(created.id),
                });
            }
        };

        self.transition(CheckoutState::VerifyingPayment {
            order_id: created.id.clone(),
        });
        let order = self.verify(&credential, &created, &proof).await?;

        self.cart.write().await.clear_cart();
        self.prepared = None;
        log_audit(
            &session.user_id,
            "order_paid",
            Some("orders"),
            Some(serde_json::json!({ "order_id": order.id })),
        );

        Ok(CheckoutState::Completed {
            order_id: order.id.clone(),
            order,
        })
    }

    async fn resolve(&mut self, address: &DraftAddress, credential: &Credential) -> Result<String, CheckoutFailure> {
        let limit = self.deps.settings.backend_timeout;

        if self.saved_addresses.is_none() {
            // A stale or missing listing is tolerated: the duplicate signal covers it.
            let saved = match timeout(limit, self.deps.addresses.list_addresses(credential)).await {
                Ok(Ok(saved)) => saved,
                Ok(Err(err)) => {
                    tracing::warn!(error = %err, "could not load saved addresses");
                    Vec::new()
                }
                Err(_) => {
                    tracing::warn!("loading saved addresses timed out");
                    Vec::new()
                }
            };
            self.saved_addresses = Some(saved);
        }

        let existing = self.saved_addresses.get_or_insert_with(Vec::new);
        let resolver = AddressResolver::new(self.deps.addresses.as_ref());

        match timeout(limit, resolver.resolve_address_id(address, existing, credential)).await {
            Ok(Ok(id)) => Ok(id),
            Ok(Err(ResolveError::Invalid(errors))) => Err(CheckoutFailure::Validation { errors }),
            Ok(Err(err)) => Err(CheckoutFailure::AddressResolution {
                address_type: address.address_type,
                message: err.to_string(),
            }),
            Err(_) => Err(CheckoutFailure::Timeout {
                stage: CheckoutStage::ResolvingAddresses,
                order_id: None,
            }),
        }
    }

    async fn create_order(
        &mut self,
        credential: &Credential,
        billing_address_id: String,
        shipping_address_id: String,
    ) -> Result<CreatedOrder, CheckoutFailure> {
        let (items, total) = {
            let cart = self.cart.read().await;
            (cart.snapshot(), cart.total_price())
        };
        if items.is_empty() {
            return Err(CheckoutFailure::OrderCreation {
                message: "the cart was emptied during checkout".into(),
            });
        }

        let amount = total
            .checked_mul(MINOR_UNITS_PER_MAJOR)
            .ok_or_else(|| CheckoutFailure::OrderCreation {
                message: "the cart total is too large".into(),
            })?;

        let request = CreateOrderRequest {
            items,
            amount,
            currency: self.deps.settings.currency.clone(),
            billing_address_id,
            shipping_address_id,
        };

        let created = match timeout(
            self.deps.settings.backend_timeout,
            self.deps.orders.create_order(credential, &request),
        )
        .await
        {
            Ok(Ok(created)) => created,
            Ok(Err(err)) => {
                if err.is_rejection() {
                    // The ids may be stale; resolve again on the next attempt.
                    tracing::warn!(error = %err, "order rejected, dropping resolved addresses");
                    self.prepared = None;
                    self.saved_addresses = None;
                }
                return Err(CheckoutFailure::OrderCreation {
                    message: err.to_string(),
                });
            }
            Err(_) => {
                return Err(CheckoutFailure::Timeout {
                    stage: CheckoutStage::CreatingOrder,
                    order_id: None,
                });
            }
        };

        if created.id.trim().is_empty() || created.gateway_order.id.trim().is_empty() || created.amount <= 0 {
            return Err(CheckoutFailure::OrderCreation {
                message: "the backend returned an incomplete order".into(),
            });
        }
        if created.amount != request.amount {
            tracing::info!(
                order_id = %created.id,
                requested = request.amount,
                charged = created.amount,
                "backend amount differs from cart total"
            );
        }

        Ok(created)
    }

    /// Exactly one call to the verification endpoint per attempt.
    async fn verify(
        &self,
        credential: &Credential,
        created: &CreatedOrder,
        proof: &PaymentProof,
    ) -> Result<Order, CheckoutFailure> {
        let failure = |message: String| CheckoutFailure::Verification {
            order_id: created.id.clone(),
            message,
        };

        if proof.razorpay_order_id != created.gateway_order.id {
            return Err(failure("payment belongs to a different order".into()));
        }

        let request = VerifyPaymentRequest::new(proof, &created.id);
        match timeout(
            self.deps.settings.backend_timeout,
            self.deps.orders.verify_payment(credential, &request),
        )
        .await
        {
            Ok(Ok(order)) if matches!(order.status, OrderStatus::Failed | OrderStatus::Cancelled) => {
                Err(failure(format!("order is marked {:?}", order.status).to_lowercase()))
            }
            Ok(Ok(order)) => Ok(order),
            Ok(Err(err)) => Err(failure(err.to_string())),
            // The charge may have gone through; leave reconciliation to support.
            Err(_) => Err(failure("verification timed out".into())),
        }
    }

    fn payment_request(&self, session: &Session, billing: &DraftAddress, created: &CreatedOrder) -> PaymentRequest {
        let billing = billing.trimmed();
        PaymentRequest {
            key: self.deps.settings.payment_key_id.clone(),
            amount: created.amount,
            currency: created.currency.clone(),
            name: MERCHANT_NAME.to_string(),
            description: "Order payment".to_string(),
            order_id: created.gateway_order.id.clone(),
            prefill: PaymentPrefill {
                name: billing.full_name.clone(),
                contact: billing.phone.clone(),
                email: session.email.clone(),
            },
            notes: PaymentNotes {
                address: billing.street,
                city: billing.city,
                state: billing.state,
                postal_code: billing.postal_code,
            },
        }
    }

    fn transition(&self, state: CheckoutState) {
        tracing::debug!(state = state.name(), "checkout transition");
        self.state.send_replace(state);
    }
}

fn validate_input(input: &CheckoutInput) -> Result<(DraftAddress, DraftAddress), CheckoutFailure> {
    let billing = input.billing.clone().into_draft(AddressType::Billing);
    let mut errors = validate_address(&billing).err().unwrap_or_default();

    let shipping = if input.same_as_billing {
        billing.with_type(AddressType::Shipping)
    } else {
        match &input.shipping {
            Some(form) => {
                let shipping = form.clone().into_draft(AddressType::Shipping);
                errors.extend(validate_address(&shipping).err().unwrap_or_default());
                shipping
            }
            None => {
                errors.push(FieldError {
                    address_type: AddressType::Shipping,
                    field: "shipping".to_string(),
                    message: "is required unless it is the same as billing".to_string(),
                });
                billing.with_type(AddressType::Shipping)
            }
        }
    };

    if errors.is_empty() {
        Ok((billing, shipping))
    } else {
        Err(CheckoutFailure::Validation { errors })
    }
}

/// A panic inside the attempt still ends in a published `Failed` state.
pub fn spawn_checkout(
    mut orchestrator: OwnedMutexGuard<CheckoutOrchestrator>,
    session: Session,
    input: CheckoutInput,
) -> JoinHandle<()> {
    let state = orchestrator.state.clone();
    let attempt = tokio::spawn(async move {
        orchestrator.run(&session, input).await;
    });

    tokio::spawn(async move {
        if let Err(err) = attempt.await {
            tracing::error!(error = %err, "checkout task aborted");
            state.send_replace(CheckoutState::Failed {
                error: CheckoutFailure::Unknown {
                    message: "checkout stopped unexpectedly".into(),
                },
            });
        }
    })
}
