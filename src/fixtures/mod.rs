//! Fixtures
//!
//! YAML fixture sets of products, promotions and carts. A set named `storefront` is read from
//! `products/storefront.yml`, `promotions/storefront.yml` and `carts/storefront.yml` under the
//! base path.

use std::{fs, path::PathBuf};

use rustc_hash::FxHashMap;
use rusty_money::iso::Currency;
use slotmap::SlotMap;
use thiserror::Error;
use tracing::debug;

use crate::{
    basket::{Basket, BasketError},
    customers::Customer,
    fixtures::{
        carts::CartsFixture,
        products::{ProductsFixture, parse_price},
        promotions::PromotionsFixture,
    },
    items::LineItem,
    orders::OrderContext,
    products::{Product, ProductKey},
    promotions::{Promotion, PromotionKey, PromotionMeta, code::PromotionCodeError},
    store::{MemoryStore, StoreError},
};

pub mod carts;
pub mod products;
pub mod promotions;

/// Fixture Parsing Errors
#[derive(Debug, Error)]
pub enum FixtureError {
    /// IO error reading fixture files
    #[error("Failed to read fixture file: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error
    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_norway::Error),

    /// Invalid price format
    #[error("Invalid price format: {0}")]
    InvalidPrice(String),

    /// Invalid percentage format
    #[error("Invalid percentage format: {0}")]
    InvalidPercentage(String),

    /// Unknown currency code
    #[error("Unknown currency code: {0}")]
    UnknownCurrency(String),

    /// Product not found
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Promotion not found
    #[error("Promotion not found: {0}")]
    PromotionNotFound(String),

    /// Cart not found
    #[error("Cart not found: {0}")]
    CartNotFound(String),

    /// Invalid promotion data
    #[error("Invalid promotion data: {0}")]
    InvalidPromotionData(String),

    /// Currency mismatch between products
    #[error("Currency mismatch: expected {0}, found {1}")]
    CurrencyMismatch(String, String),

    /// No products loaded yet
    #[error("No products loaded yet; currency unknown")]
    NoCurrency,

    /// Basket creation error
    #[error("Failed to create basket: {0}")]
    Basket(#[from] BasketError),

    /// Invalid promotion code
    #[error("Invalid promotion code: {0}")]
    Code(#[from] PromotionCodeError),

    /// Promotions could not be added to a store
    #[error("Failed to populate store: {0}")]
    Store(#[from] StoreError),
}

/// Fixture
#[derive(Debug)]
pub struct Fixture<'a> {
    /// Base path for fixture files
    base_path: PathBuf,

    /// `SlotMaps` to store the actual types with generated keys
    product_meta: SlotMap<ProductKey, Product<'a>>,
    promotion_meta: SlotMap<PromotionKey, PromotionMeta>,

    /// String key -> `SlotMap` key mappings for lookups
    product_keys: FxHashMap<String, ProductKey>,
    promotion_keys: FxHashMap<String, PromotionKey>,

    /// Pre-built promotions, in load order
    promotions: Vec<Promotion<'a>>,

    /// Pre-built orders
    carts: FxHashMap<String, OrderContext<'a>>,

    /// Currency for the fixture set
    currency: Option<&'static Currency>,
}

impl<'a> Fixture<'a> {
    /// Create a new empty fixture with default base path
    pub fn new() -> Self {
        Self::with_base_path("./fixtures")
    }

    /// Create a new empty fixture with custom base path
    pub fn with_base_path(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
            product_meta: SlotMap::with_key(),
            promotion_meta: SlotMap::with_key(),
            product_keys: FxHashMap::default(),
            promotion_keys: FxHashMap::default(),
            promotions: Vec::new(),
            carts: FxHashMap::default(),
            currency: None,
        }
    }

    fn read(&self, category: &str, name: &str) -> Result<String, FixtureError> {
        let file_path = self.base_path.join(category).join(format!("{name}.yml"));

        debug!(path = %file_path.display(), "reading fixture");

        Ok(fs::read_to_string(&file_path)?)
    }

    /// Load products from a YAML fixture file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or if there are currency mismatches.
    pub fn load_products(&mut self, name: &str) -> Result<&mut Self, FixtureError> {
        let fixture: ProductsFixture = serde_norway::from_str(&self.read("products", name)?)?;

        for (key, product_fixture) in fixture.products {
            let (_minor_units, currency) = parse_price(&product_fixture.price)?;

            match self.currency {
                Some(existing) if existing != currency => {
                    return Err(FixtureError::CurrencyMismatch(
                        existing.iso_alpha_code.to_string(),
                        currency.iso_alpha_code.to_string(),
                    ));
                }
                Some(_) => {}
                None => self.currency = Some(currency),
            }

            let product: Product<'a> = product_fixture.try_into()?;
            let product_key = self.product_meta.insert(product);

            self.product_keys.insert(key, product_key);
        }

        Ok(self)
    }

    /// Load promotions from a YAML fixture file
    ///
    /// Products must be loaded first when promotions refer to them or carry amounts.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or a promotion is invalid.
    pub fn load_promotions(&mut self, name: &str) -> Result<&mut Self, FixtureError> {
        let fixture: PromotionsFixture = serde_norway::from_str(&self.read("promotions", name)?)?;

        for (key, promotion_fixture) in fixture.promotions {
            let (meta, mut promotion) =
                promotion_fixture.try_into_promotion(&self.product_keys, self.currency)?;

            let promotion_key = self.promotion_meta.insert(meta);

            promotion.set_key(promotion_key);

            self.promotions.push(promotion);
            self.promotion_keys.insert(key, promotion_key);
        }

        Ok(self)
    }

    /// Load carts from a YAML fixture file, priced from the loaded products
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, a product is unknown, or a code is
    /// blank.
    pub fn load_carts(&mut self, name: &str) -> Result<&mut Self, FixtureError> {
        let fixture: CartsFixture = serde_norway::from_str(&self.read("carts", name)?)?;
        let currency = self.currency()?;

        for (key, cart) in fixture.carts {
            let lines = cart
                .lines
                .into_iter()
                .map(|line| {
                    let product_key = self.product_key(&line.product)?;
                    let product = self.product(&line.product)?;

                    Ok(LineItem::new(product_key, product.price, line.quantity))
                })
                .collect::<Result<Vec<_>, FixtureError>>()?;

            let mut customer = Customer::new(&cart.customer);

            if let Some(tier) = cart.loyalty_tier {
                customer = customer.with_loyalty_tier(tier);
            }

            let mut order = OrderContext::new(customer, Basket::with_lines(lines, currency)?);

            for code in cart.applied_codes {
                order = order.with_applied_code(code.parse()?);
            }

            self.carts.insert(key, order);
        }

        Ok(self)
    }

    /// Load a complete fixture set (products, promotions and carts with the same name)
    ///
    /// # Errors
    ///
    /// Returns an error if any of the fixture files cannot be loaded.
    pub fn from_set(name: &str) -> Result<Self, FixtureError> {
        let mut fixture = Self::new();

        fixture
            .load_products(name)?
            .load_promotions(name)?
            .load_carts(name)?;

        Ok(fixture)
    }

    /// Get a product by its string key
    ///
    /// # Errors
    ///
    /// Returns an error if the product is not found.
    pub fn product(&self, key: &str) -> Result<&Product<'a>, FixtureError> {
        let product_key = self.product_key(key)?;

        self.product_meta
            .get(product_key)
            .ok_or_else(|| FixtureError::ProductNotFound(key.to_string()))
    }

    /// Get a product key by its string key
    ///
    /// # Errors
    ///
    /// Returns an error if the product is not found.
    pub fn product_key(&self, key: &str) -> Result<ProductKey, FixtureError> {
        self.product_keys
            .get(key)
            .copied()
            .ok_or_else(|| FixtureError::ProductNotFound(key.to_string()))
    }

    /// Get a promotion by its string key
    ///
    /// # Errors
    ///
    /// Returns an error if the promotion is not found.
    pub fn promotion(&self, key: &str) -> Result<&Promotion<'a>, FixtureError> {
        let promotion_key = self
            .promotion_keys
            .get(key)
            .ok_or_else(|| FixtureError::PromotionNotFound(key.to_string()))?;

        self.promotions
            .iter()
            .find(|p| p.key() == *promotion_key)
            .ok_or_else(|| FixtureError::PromotionNotFound(key.to_string()))
    }

    /// Get promotion metadata by its string key
    ///
    /// # Errors
    ///
    /// Returns an error if the promotion is not found.
    pub fn promotion_meta(&self, key: &str) -> Result<&PromotionMeta, FixtureError> {
        let promotion_key = self
            .promotion_keys
            .get(key)
            .ok_or_else(|| FixtureError::PromotionNotFound(key.to_string()))?;

        self.promotion_meta
            .get(*promotion_key)
            .ok_or_else(|| FixtureError::PromotionNotFound(key.to_string()))
    }

    /// Get all promotions, in load order
    pub fn promotions(&self) -> &[Promotion<'a>] {
        &self.promotions
    }

    /// Get a copy of a cart's order context
    ///
    /// # Errors
    ///
    /// Returns an error if the cart is not found.
    pub fn cart(&self, key: &str) -> Result<OrderContext<'a>, FixtureError> {
        self.carts
            .get(key)
            .cloned()
            .ok_or_else(|| FixtureError::CartNotFound(key.to_string()))
    }

    /// Get the currency
    ///
    /// # Errors
    ///
    /// Returns an error if no products have been loaded yet.
    pub fn currency(&self) -> Result<&'static Currency, FixtureError> {
        self.currency.ok_or(FixtureError::NoCurrency)
    }

    /// Get the product metadata `SlotMap`
    pub fn product_meta_map(&self) -> &SlotMap<ProductKey, Product<'a>> {
        &self.product_meta
    }

    /// Insert the loaded promotions into a store, in load order.
    ///
    /// Returns the metadata of each promotion under the key the store assigned it.
    ///
    /// # Errors
    ///
    /// Returns an error if the store rejects a promotion, e.g. for a duplicate code.
    pub fn populate(
        &self,
        store: &MemoryStore<'a>,
    ) -> Result<FxHashMap<PromotionKey, PromotionMeta>, FixtureError> {
        let mut names = FxHashMap::default();

        for promotion in &self.promotions {
            let meta = self
                .promotion_meta
                .get(promotion.key())
                .cloned()
                .ok_or_else(|| FixtureError::PromotionNotFound(format!("{:?}", promotion.key())))?;

            let key = store.insert(promotion.clone())?;

            names.insert(key, meta);
        }

        debug!(promotions = names.len(), "store populated from fixture");

        Ok(names)
    }
}

impl Default for Fixture<'_> {
    fn default() -> Self {
        Self::new()
    }
}
