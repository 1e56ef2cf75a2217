pub mod freshness;

pub use freshness::{FreshnessConfig, LinkResolver};
