pub mod address_resolver;
pub mod backend;
pub mod checkout;
pub mod payment;
