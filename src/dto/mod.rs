pub mod addresses;
pub mod cart;
pub mod checkout;
pub mod profile;
pub mod wishlist;
