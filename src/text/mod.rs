pub mod metrics;
pub mod table;
pub mod wrap;
