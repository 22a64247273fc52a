use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{models::PersistedAddress, services::address_resolver::default_addresses};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SavedAddresses {
    pub items: Vec<PersistedAddress>,
    pub default_billing: Option<PersistedAddress>,
    pub default_shipping: Option<PersistedAddress>,
}

impl From<Vec<PersistedAddress>> for SavedAddresses {
    fn from(items: Vec<PersistedAddress>) -> Self {
        let (billing, shipping) = default_addresses(&items);
        let (default_billing, default_shipping) = (billing.cloned(), shipping.cloned());
        Self {
            items,
            default_billing,
            default_shipping,
        }
    }
}
