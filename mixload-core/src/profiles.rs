//! Built-in traffic profiles for the product catalog API.

mod health;
mod products;
mod search;

use std::sync::Arc;

pub use health::{HealthOptions, HealthProfile};
pub use products::ProductsProfile;
pub use search::{SEARCH_KEYWORDS, SearchProfile};

use crate::error::Result;
use crate::profile::{ProfileRegistry, TrafficProfile};

pub const PRODUCTS: &str = "products";
pub const SEARCH: &str = "search";
pub const HEALTH: &str = "health";

/// `products` (70), `search` (25) and `health` (5), in that order.
pub fn builtin_registry(health: HealthOptions) -> Result<ProfileRegistry> {
    let mut registry = ProfileRegistry::new();
    registry.register(TrafficProfile::new(PRODUCTS, 70, Arc::new(ProductsProfile)))?;
    registry.register(TrafficProfile::new(SEARCH, 25, Arc::new(SearchProfile)))?;
    registry.register(TrafficProfile::new(
        HEALTH,
        5,
        Arc::new(HealthProfile::new(health)?),
    ))?;
    Ok(registry)
}
