pub mod calc;

pub use calc::calculate_request_cost;
