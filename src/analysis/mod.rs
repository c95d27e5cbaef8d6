//! Analysis stages and the pure computations over their results.

pub mod aggregator;
pub mod confidence;
pub mod stages;

pub use aggregator::{recommended_items, suggested_actions, RecommendedItems};
