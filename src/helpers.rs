pub mod cache;
pub mod converters;
pub mod recurring;
pub mod rules;
pub mod scoped;
pub mod stats;
