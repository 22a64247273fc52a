use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{models::Product, store::wishlist::WishlistStore};

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct AddToWishlistRequest {
    pub product: Product,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct WishlistView {
    pub items: Vec<Product>,
    pub count: usize,
}

impl From<&WishlistStore> for WishlistView {
    fn from(wishlist: &WishlistStore) -> Self {
        Self {
            items: wishlist.items().to_vec(),
            count: wishlist.wishlist_count(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct WishlistMembership {
    pub product_id: String,
    pub in_wishlist: bool,
}
