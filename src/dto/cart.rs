use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    models::{CartItem, Product},
    store::cart::CartStore,
};

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct AddToCartRequest {
    pub product: Product,
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct UpdateQuantityRequest {
    /// Zero or less removes the line.
    pub quantity: i64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CartView {
    pub items: Vec<CartItem>,
    pub total_items: u64,
    pub total_price: i64,
}

impl From<&CartStore> for CartView {
    fn from(cart: &CartStore) -> Self {
        Self {
            items: cart.items().to_vec(),
            total_items: cart.total_items(),
            total_price: cart.total_price(),
        }
    }
}
