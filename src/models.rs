use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const MINOR_UNITS_PER_MAJOR: i64 = 100;

/// An artwork as published by the catalog. Prices are whole major units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Product {
    pub id: String,
    pub title: String,
    pub artist: String,
    pub price: i64,
    pub image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub category: String,
    pub dimensions: String,
    pub medium: String,
    pub year: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CartItem {
    pub product: Product,
    pub quantity: u32,
}

impl CartItem {
    pub fn line_total(&self) -> Option<i64> {
        self.product.price.checked_mul(i64::from(self.quantity))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AddressType {
    Billing,
    Shipping,
}

impl std::fmt::Display for AddressType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AddressType::Billing => f.write_str("billing"),
            AddressType::Shipping => f.write_str("shipping"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AddressForm {
    pub full_name: String,
    pub phone: String,
    pub street: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
    #[serde(default = "default_true")]
    pub is_default: bool,
}

fn default_true() -> bool {
    true
}

impl AddressForm {
    pub fn into_draft(self, address_type: AddressType) -> DraftAddress {
        DraftAddress {
            full_name: self.full_name,
            phone: self.phone,
            street: self.street,
            city: self.city,
            state: self.state,
            postal_code: self.postal_code,
            country: self.country,
            address_type,
            is_default: self.is_default,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DraftAddress {
    pub full_name: String,
    pub phone: String,
    pub street: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
    pub address_type: AddressType,
    #[serde(default)]
    pub is_default: bool,
}

impl DraftAddress {
    /// Copy with every text field trimmed, which is the shape sent to the backend.
    pub fn trimmed(&self) -> Self {
        Self {
            full_name: self.full_name.trim().to_string(),
            phone: self.phone.trim().to_string(),
            street: self.street.trim().to_string(),
            city: self.city.trim().to_string(),
            state: self.state.trim().to_string(),
            postal_code: self.postal_code.trim().to_string(),
            country: self.country.trim().to_string(),
            address_type: self.address_type,
            is_default: self.is_default,
        }
    }

    pub fn with_type(&self, address_type: AddressType) -> Self {
        Self {
            address_type,
            ..self.clone()
        }
    }

    /// Compared after trimming and case folding. `is_default` is ignored.
    pub fn same_record_as(&self, other: &DraftAddress) -> bool {
        fn eq(a: &str, b: &str) -> bool {
            a.trim().to_lowercase() == b.trim().to_lowercase()
        }

        self.address_type == other.address_type
            && eq(&self.full_name, &other.full_name)
            && eq(&self.phone, &other.phone)
            && eq(&self.street, &other.street)
            && eq(&self.city, &other.city)
            && eq(&self.state, &other.state)
            && eq(&self.postal_code, &other.postal_code)
            && eq(&self.country, &other.country)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PersistedAddress {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(flatten)]
    pub address: DraftAddress,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Created,
    #[serde(alias = "pending")]
    PendingPayment,
    Paid,
    Failed,
    Cancelled,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct OrderLineItem {
    pub product_id: String,
    pub title: String,
    pub artist: String,
    pub image: String,
    pub unit_price: i64,
    pub quantity: u32,
}

impl From<&CartItem> for OrderLineItem {
    fn from(item: &CartItem) -> Self {
        Self {
            product_id: item.product.id.clone(),
            title: item.product.title.clone(),
            artist: item.product.artist.clone(),
            image: item.product.image.clone(),
            unit_price: item.product.price,
            quantity: item.quantity,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Order {
    pub id: String,
    pub status: OrderStatus,
    pub amount: i64,
    pub currency: String,
    #[serde(default)]
    pub billing_address_id: Option<String>,
    #[serde(default)]
    pub shipping_address_id: Option<String>,
    #[serde(default, alias = "order_items")]
    pub items: Vec<OrderLineItem>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Profile {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}
