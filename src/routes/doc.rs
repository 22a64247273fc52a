use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        addresses::SavedAddresses,
        cart::{AddToCartRequest, CartView, UpdateQuantityRequest},
        checkout::{CheckoutRequest, PaymentCallback},
        profile::{ProfileView, UpdateProfileRequest},
        wishlist::{AddToWishlistRequest, WishlistMembership, WishlistView},
    },
    models::{
        AddressForm, AddressType, CartItem, DraftAddress, Order, OrderLineItem, OrderStatus,
        PersistedAddress, Product, Profile,
    },
    response::{ApiResponse, Meta},
    routes::{addresses, cart, checkout, health, orders, profile, wishlist},
    services::{
        address_resolver::FieldError,
        checkout::{CheckoutFailure, CheckoutStage, CheckoutState},
        payment::{PaymentNotes, PaymentPrefill, PaymentProof, PaymentRequest},
    },
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        cart::cart_list,
        cart::add_to_cart,
        cart::update_quantity,
        cart::remove_from_cart,
        wishlist::list_wishlist,
        wishlist::add_to_wishlist,
        wishlist::wishlist_membership,
        wishlist::remove_from_wishlist,
        wishlist::move_to_cart,
        addresses::list_addresses,
        checkout::start_checkout,
        checkout::checkout_status,
        checkout::payment_callback,
        orders::list_orders,
        orders::get_order,
        profile::get_profile,
        profile::update_profile
    ),
    components(
        schemas(
            Product,
            CartItem,
            AddressType,
            AddressForm,
            DraftAddress,
            PersistedAddress,
            Order,
            OrderLineItem,
            OrderStatus,
            Profile,
            ProfileView,
            UpdateProfileRequest,
            AddToCartRequest,
            UpdateQuantityRequest,
            CartView,
            AddToWishlistRequest,
            WishlistView,
            WishlistMembership,
            SavedAddresses,
            CheckoutRequest,
            PaymentCallback,
            PaymentProof,
            PaymentRequest,
            PaymentPrefill,
            PaymentNotes,
            FieldError,
            CheckoutStage,
            CheckoutFailure,
            CheckoutState,
            Meta,
            ApiResponse<CartView>,
            ApiResponse<WishlistView>,
            ApiResponse<CheckoutState>,
            ApiResponse<Order>,
            ApiResponse<Vec<Order>>,
            ApiResponse<ProfileView>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Cart", description = "Cart endpoints"),
        (name = "Wishlist", description = "Wishlist endpoints"),
        (name = "Addresses", description = "Saved address endpoints"),
        (name = "Checkout", description = "Checkout and payment endpoints"),
        (name = "Orders", description = "Order endpoints"),
        (name = "Profile", description = "Shopper profile endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
