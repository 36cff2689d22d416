pub mod pricing;
pub mod types;

pub use pricing::calculate_request_cost;
pub use types::*;
