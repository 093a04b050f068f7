//! Product Scope
//!
//! Allow/deny lists deciding which cart lines a promotion can apply to.

use rustc_hash::FxHashSet;

use crate::{items::LineItem, products::ProductKey};

/// Products a promotion applies to.
///
/// An empty `applicable` set means every product; `excluded` always wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductScope {
    applicable: FxHashSet<ProductKey>,
    excluded: FxHashSet<ProductKey>,
}

impl ProductScope {
    /// Scope covering the whole cart.
    #[must_use]
    pub fn whole_cart() -> Self {
        Self::default()
    }

    /// Create a scope from allow and deny lists.
    pub fn new(
        applicable: impl IntoIterator<Item = ProductKey>,
        excluded: impl IntoIterator<Item = ProductKey>,
    ) -> Self {
        Self {
            applicable: applicable.into_iter().collect(),
            excluded: excluded.into_iter().collect(),
        }
    }

    /// Restrict the scope to the given products.
    #[must_use]
    pub fn only(products: impl IntoIterator<Item = ProductKey>) -> Self {
        Self::new(products, [])
    }

    /// Exclude the given products from the whole cart.
    #[must_use]
    pub fn except(products: impl IntoIterator<Item = ProductKey>) -> Self {
        Self::new([], products)
    }

    /// Whether both lists are empty.
    #[must_use]
    pub fn is_whole_cart(&self) -> bool {
        self.applicable.is_empty() && self.excluded.is_empty()
    }

    /// Whether the product is covered by this scope.
    #[must_use]
    pub fn includes(&self, product: ProductKey) -> bool {
        (self.applicable.is_empty() || self.applicable.contains(&product))
            && !self.excluded.contains(&product)
    }

    /// Lines covered by this scope.
    pub fn eligible_lines<'l, 'a: 'l>(
        &self,
        lines: impl IntoIterator<Item = &'l LineItem<'a>>,
    ) -> impl Iterator<Item = &'l LineItem<'a>> {
        lines
            .into_iter()
            .filter(move |line| self.includes(line.product()))
    }
}
