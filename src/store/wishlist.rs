use crate::models::Product;

#[derive(Debug, Clone, Default)]
pub struct WishlistStore {
    items: Vec<Product>,
}

impl WishlistStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_to_wishlist(&mut self, product: Product) {
        if !self.is_in_wishlist(&product.id) {
            self.items.push(product);
        }
    }

    pub fn remove_from_wishlist(&mut self, product_id: &str) -> Option<Product> {
        let index = self.items.iter().position(|p| p.id == product_id)?;
        Some(self.items.remove(index))
    }

    pub fn get(&self, product_id: &str) -> Option<&Product> {
        self.items.iter().find(|p| p.id == product_id)
    }

    pub fn is_in_wishlist(&self, product_id: &str) -> bool {
        self.items.iter().any(|p| p.id == product_id)
    }

    pub fn wishlist_count(&self) -> usize {
        self.items.len()
    }

    pub fn items(&self) -> &[Product] {
        &self.items
    }
}
