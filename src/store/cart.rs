use thiserror::Error;

use crate::models::{CartItem, MINOR_UNITS_PER_MAJOR, OrderLineItem, Product};

/// Largest cart total, in major units, whose minor-unit amount still fits in an `i64`.
pub const MAX_CART_TOTAL: i64 = i64::MAX / MINOR_UNITS_PER_MAJOR;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CartError {
    #[error("price must not be negative")]
    NegativePrice,

    #[error("quantity must be between 1 and {}", u32::MAX)]
    QuantityOutOfRange,

    #[error("cart total would exceed {MAX_CART_TOTAL}")]
    TotalOutOfRange,
}

/// Every mutation keeps the total within `MAX_CART_TOTAL`.
#[derive(Debug, Clone, Default)]
pub struct CartStore {
    items: Vec<CartItem>,
}

impl CartStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_to_cart(&mut self, product: Product) -> Result<(), CartError> {
        if product.price < 0 {
            return Err(CartError::NegativePrice);
        }

        match self.position(&product.id) {
            Some(index) => {
                let quantity = self.items[index]
                    .quantity
                    .checked_add(1)
                    .ok_or(CartError::QuantityOutOfRange)?;
                let unit_price = self.items[index].product.price;
                self.checked_total_with(Some(index), unit_price, quantity)?;
                self.items[index].quantity = quantity;
            }
            None => {
                self.checked_total_with(None, product.price, 1)?;
                self.items.push(CartItem {
                    product,
                    quantity: 1,
                });
            }
        }
        Ok(())
    }

    pub fn remove_from_cart(&mut self, product_id: &str) {
        self.items.retain(|item| item.product.id != product_id);
    }

    /// Zero or negative removes the line.
    pub fn update_quantity(&mut self, product_id: &str, quantity: i64) -> Result<(), CartError> {
        if quantity <= 0 {
            self.remove_from_cart(product_id);
            return Ok(());
        }

        let quantity = u32::try_from(quantity).map_err(|_| CartError::QuantityOutOfRange)?;
        if let Some(index) = self.position(product_id) {
            let unit_price = self.items[index].product.price;
            self.checked_total_with(Some(index), unit_price, quantity)?;
            self.items[index].quantity = quantity;
        }
        Ok(())
    }

    pub fn total_price(&self) -> i64 {
        sum_lines(self.items.iter()).unwrap_or(MAX_CART_TOTAL)
    }

    pub fn total_items(&self) -> u64 {
        self.items.iter().map(|item| u64::from(item.quantity)).sum()
    }

    pub fn clear_cart(&mut self) {
        self.items.clear();
    }

    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn get(&self, product_id: &str) -> Option<&CartItem> {
        self.items.iter().find(|item| item.product.id == product_id)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn snapshot(&self) -> Vec<OrderLineItem> {
        self.items.iter().map(OrderLineItem::from).collect()
    }

    fn position(&self, product_id: &str) -> Option<usize> {
        self.items
            .iter()
            .position(|item| item.product.id == product_id)
    }

    fn checked_total_with(
        &self,
        replaced: Option<usize>,
        unit_price: i64,
        quantity: u32,
    ) -> Result<i64, CartError> {
        let others = self
            .items
            .iter()
            .enumerate()
            .filter(|(index, _)| Some(*index) != replaced)
            .map(|(_, item)| item);

        sum_lines(others)
            .and_then(|sum| sum.checked_add(unit_price.checked_mul(i64::from(quantity))?))
            .filter(|total| *total <= MAX_CART_TOTAL)
            .ok_or(CartError::TotalOutOfRange)
    }
}

fn sum_lines<'a>(items: impl Iterator<Item = &'a CartItem>) -> Option<i64> {
    items.fold(Some(0i64), |acc, item| acc?.checked_add(item.line_total()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(id: &str, price: i64) -> Product {
        Product {
            id: id.to_string(),
            title: format!("Artwork {id}"),
            artist: "Meera Iyer".to_string(),
            price,
            image: format!("/images/{id}.jpg"),
            description: None,
            category: "abstract".to_string(),
            dimensions: "24 x 36 in".to_string(),
            medium: "Oil on canvas".to_string(),
            year: 2023,
        }
    }

    #[test]
    fn adding_same_product_twice_increments_quantity() {
        let mut cart = CartStore::new();
        cart.add_to_cart(product("1", 2500)).unwrap();
        cart.add_to_cart(product("1", 2500)).unwrap();

        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.get("1").map(|item| item.quantity), Some(2));
        assert_eq!(cart.total_price(), 5000);
    }

    #[test]
    fn update_quantity_to_zero_or_negative_removes_line() {
        let mut cart = CartStore::new();
        cart.add_to_cart(product("1", 100)).unwrap();
        cart.add_to_cart(product("2", 200)).unwrap();

        cart.update_quantity("1", 0).unwrap();
        cart.update_quantity("2", -1).unwrap();

        assert!(cart.is_empty());
    }

    #[test]
    fn update_quantity_sets_exact_value_and_ignores_unknown_ids() {
        let mut cart = CartStore::new();
        cart.add_to_cart(product("1", 100)).unwrap();

        cart.update_quantity("1", 5).unwrap();
        cart.update_quantity("missing", 3).unwrap();

        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.total_items(), 5);
        assert_eq!(cart.total_price(), 500);
    }

    #[test]
    fn remove_of_absent_product_is_a_no_op() {
        let mut cart = CartStore::new();
        cart.add_to_cart(product("1", 100)).unwrap();
        cart.remove_from_cart("2");
        assert_eq!(cart.total_items(), 1);
    }

    #[test]
    fn totals_match_independent_recomputation_over_mixed_operations() {
        let catalog = [product("a", 1200), product("b", 999), product("c", 45_000)];
        let mut cart = CartStore::new();
        let mut expected: Vec<(String, i64, i64)> = Vec::new();

        // (op, product index, quantity)
        let ops: [(u8, usize, i64); 12] = [
            (0, 0, 0),
            (0, 1, 0),
            (0, 0, 0),
            (2, 1, 4),
            (0, 2, 0),
            (1, 0, 0),
            (2, 2, 3),
            (0, 0, 0),
            (2, 1, 0),
            (0, 1, 0),
            (2, 0, 7),
            (1, 2, 0),
        ];

        for (op, index, quantity) in ops {
            let p = &catalog[index];
            match op {
                0 => {
                    cart.add_to_cart(p.clone()).unwrap();
                    match expected.iter_mut().find(|(id, _, _)| *id == p.id) {
                        Some(entry) => entry.2 += 1,
                        None => expected.push((p.id.clone(), p.price, 1)),
                    }
                }
                1 => {
                    cart.remove_from_cart(&p.id);
                    expected.retain(|(id, _, _)| *id != p.id);
                }
                _ => {
                    cart.update_quantity(&p.id, quantity).unwrap();
                    if quantity <= 0 {
                        expected.retain(|(id, _, _)| *id != p.id);
                    } else if let Some(entry) = expected.iter_mut().find(|(id, _, _)| *id == p.id) {
                        entry.2 = quantity;
                    }
                }
            }

            let items: i64 = expected.iter().map(|(_, _, q)| q).sum();
            let price: i64 = expected.iter().map(|(_, price, q)| price * q).sum();
            assert_eq!(cart.total_items() as i64, items);
            assert_eq!(cart.total_price(), price);
        }
    }

    #[test]
    fn snapshot_is_independent_of_later_cart_changes() {
        let mut cart = CartStore::new();
        cart.add_to_cart(product("1", 300)).unwrap();
        let snapshot = cart.snapshot();

        cart.update_quantity("1", 9).unwrap();

        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].quantity, 1);
        assert_eq!(snapshot[0].unit_price, 300);
    }

    #[test]
    fn quantity_that_would_overflow_the_total_is_rejected_and_line_kept() {
        let mut cart = CartStore::new();
        cart.add_to_cart(product("1", 10_000_000_000_000)).unwrap();

        assert_eq!(
            cart.update_quantity("1", 1_000_000),
            Err(CartError::TotalOutOfRange)
        );
        assert_eq!(cart.get("1").map(|item| item.quantity), Some(1));
        assert_eq!(cart.total_price(), 10_000_000_000_000);
    }

    #[test]
    fn quantity_above_u32_is_rejected_instead_of_clamped() {
        let mut cart = CartStore::new();
        cart.add_to_cart(product("1", 1)).unwrap();

        assert_eq!(
            cart.update_quantity("1", 5_000_000_000),
            Err(CartError::QuantityOutOfRange)
        );
        assert_eq!(cart.total_items(), 1);

        cart.update_quantity("1", i64::from(u32::MAX)).unwrap();
        assert_eq!(cart.add_to_cart(product("1", 1)), Err(CartError::QuantityOutOfRange));
        assert_eq!(cart.total_items(), u64::from(u32::MAX));
    }

    #[test]
    fn negative_or_oversized_prices_never_enter_the_cart() {
        let mut cart = CartStore::new();

        assert_eq!(cart.add_to_cart(product("1", -5)), Err(CartError::NegativePrice));
        assert_eq!(
            cart.add_to_cart(product("2", MAX_CART_TOTAL + 1)),
            Err(CartError::TotalOutOfRange)
        );

        cart.add_to_cart(product("3", MAX_CART_TOTAL)).unwrap();
        assert_eq!(cart.add_to_cart(product("4", 1)), Err(CartError::TotalOutOfRange));
        assert_eq!(cart.total_price(), MAX_CART_TOTAL);
        assert!(cart.total_price().checked_mul(MINOR_UNITS_PER_MAJOR).is_some());
    }
}
