use crate::catalog::Product;
use serde::{Deserialize, Serialize};

/// Policy for products whose price is unknown when computing totals.
///
/// The catalog distinguishes "free" (0) from "unknown" (missing); what an
/// unknown price contributes to a total is a configuration choice rather
/// than a hardcoded default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingPrice {
    /// Count a missing price as 0 (the item still appears on the invoice).
    #[default]
    Zero,
    /// Leave the line out of totals; its invoice subtotal stays blank.
    Skip,
}

/// One cart line: a product snapshot plus a quantity of at least 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub product: Product,
    pub quantity: u32,
}

impl CartItem {
    /// Subtotal for this line under the given policy. `None` means the line
    /// is excluded from totals entirely.
    pub fn subtotal(&self, policy: MissingPrice) -> Option<f64> {
        match (self.product.price, policy) {
            (Some(price), _) => Some(price * self.quantity as f64),
            (None, MissingPrice::Zero) => Some(0.0),
            (None, MissingPrice::Skip) => None,
        }
    }
}

/// A session-scoped shopping cart.
///
/// Items keep insertion order; matching on add is by the product's `no`
/// identifier. All operations are synchronous and single-writer: the cart is
/// private to one session, so there is no internal locking.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Cart {
    items: Vec<CartItem>,
    policy: MissingPrice,
}

impl Cart {
    pub fn new(policy: MissingPrice) -> Self {
        Cart {
            items: Vec::new(),
            policy,
        }
    }

    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn policy(&self) -> MissingPrice {
        self.policy
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Add a product to the cart.
    ///
    /// If a line with the same product `no` already exists its quantity is
    /// incremented in place and the line keeps its position; otherwise a new
    /// line with quantity 1 is appended.
    pub fn add(&mut self, product: &Product) {
        match self.items.iter_mut().find(|i| i.product.no == product.no) {
            Some(existing) => existing.quantity += 1,
            None => self.items.push(CartItem {
                product: product.clone(),
                quantity: 1,
            }),
        }
    }

    /// Increase the quantity of the line at `index` by 1.
    ///
    /// Returns `false` when the index is out of range.
    pub fn increment(&mut self, index: usize) -> bool {
        match self.items.get_mut(index) {
            Some(item) => {
                item.quantity += 1;
                true
            }
            None => false,
        }
    }

    /// Decrease the quantity of the line at `index` by 1.
    ///
    /// A line at quantity 1 is removed outright; the cart never holds a
    /// quantity-0 line. Returns `false` when the index is out of range.
    pub fn decrement(&mut self, index: usize) -> bool {
        match self.items.get_mut(index) {
            Some(item) if item.quantity > 1 => {
                item.quantity -= 1;
                true
            }
            Some(_) => {
                self.items.remove(index);
                true
            }
            None => false,
        }
    }

    /// Remove the line at `index`. Later lines shift down, so callers must
    /// not reuse indices cached before the removal.
    ///
    /// Returns `false` when the index is out of range.
    pub fn remove(&mut self, index: usize) -> bool {
        if index < self.items.len() {
            self.items.remove(index);
            true
        } else {
            false
        }
    }

    /// Empty the cart unconditionally.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Sum of price x quantity over all lines, under the missing-price policy.
    pub fn total(&self) -> f64 {
        self.items
            .iter()
            .filter_map(|i| i.subtotal(self.policy))
            .sum()
    }

    /// Total number of units across all lines (the cart badge count).
    pub fn unit_count(&self) -> u32 {
        self.items.iter().map(|i| i.quantity).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(no: i64, name: &str, price: Option<f64>) -> Product {
        Product {
            no,
            code: format!("K{no:02}"),
            name: name.to_string(),
            price,
            moq: 1,
            category: None,
            description: None,
        }
    }

    #[test]
    fn adding_same_product_twice_merges_into_one_line() {
        let mut cart = Cart::default();
        let shirt = product(1, "Red Shirt", Some(10000.0));

        cart.add(&shirt);
        cart.add(&shirt);

        assert_eq!(cart.len(), 1);
        assert_eq!(cart.items()[0].quantity, 2);
    }

    #[test]
    fn add_keeps_insertion_order_and_existing_positions() {
        let mut cart = Cart::default();
        cart.add(&product(1, "A", Some(1.0)));
        cart.add(&product(2, "B", Some(2.0)));
        cart.add(&product(1, "A", Some(1.0)));

        let names: Vec<_> = cart.items().iter().map(|i| i.product.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B"]);
        assert_eq!(cart.items()[0].quantity, 2);
    }

    #[test]
    fn decrementing_quantity_one_removes_the_line() {
        let mut cart = Cart::default();
        cart.add(&product(1, "A", Some(10.0)));
        cart.add(&product(1, "A", Some(10.0)));

        assert!(cart.decrement(0));
        assert_eq!(cart.items()[0].quantity, 1);

        assert!(cart.decrement(0));
        assert!(cart.is_empty());
    }

    #[test]
    fn out_of_range_indices_are_rejected() {
        let mut cart = Cart::default();
        cart.add(&product(1, "A", Some(10.0)));

        assert!(!cart.increment(5));
        assert!(!cart.decrement(1));
        assert!(!cart.remove(1));
        assert_eq!(cart.len(), 1);
    }

    #[test]
    fn removal_shifts_later_lines_down_in_order() {
        let mut cart = Cart::default();
        cart.add(&product(1, "A", Some(1.0)));
        cart.add(&product(2, "B", Some(2.0)));
        cart.add(&product(3, "C", Some(3.0)));

        assert!(cart.remove(0));

        let names: Vec<_> = cart.items().iter().map(|i| i.product.name.as_str()).collect();
        assert_eq!(names, vec!["B", "C"]);
    }

    #[test]
    fn total_tracks_every_mutation() {
        let mut cart = Cart::default();
        let a = product(1, "A", Some(10000.0));
        let b = product(2, "B", Some(5000.0));

        cart.add(&a);
        cart.add(&a);
        cart.add(&b);
        assert_eq!(cart.total(), 25000.0);

        cart.decrement(0);
        assert_eq!(cart.total(), 15000.0);

        cart.increment(1);
        assert_eq!(cart.total(), 20000.0);

        cart.remove(1);
        assert_eq!(cart.total(), 10000.0);

        cart.clear();
        assert_eq!(cart.total(), 0.0);
        assert!(cart.is_empty());
    }

    #[test]
    fn missing_price_policy_controls_the_total() {
        let mystery = product(9, "Mystery", None);
        let shirt = product(1, "Shirt", Some(10000.0));

        let mut as_zero = Cart::new(MissingPrice::Zero);
        as_zero.add(&mystery);
        as_zero.add(&shirt);
        assert_eq!(as_zero.total(), 10000.0);

        let mut skipped = Cart::new(MissingPrice::Skip);
        skipped.add(&mystery);
        skipped.add(&shirt);
        assert_eq!(skipped.total(), 10000.0);
        assert_eq!(skipped.items()[0].subtotal(MissingPrice::Skip), None);
        assert_eq!(as_zero.items()[0].subtotal(MissingPrice::Zero), Some(0.0));
    }

    #[test]
    fn unit_count_sums_quantities() {
        let mut cart = Cart::default();
        cart.add(&product(1, "A", Some(1.0)));
        cart.add(&product(1, "A", Some(1.0)));
        cart.add(&product(2, "B", Some(2.0)));
        assert_eq!(cart.unit_count(), 3);
    }
}
