//! Knowledge graph construction and structural analytics.

pub mod builder;
pub mod store;

pub use builder::GraphBuilder;
pub use store::GraphAnalytics;
