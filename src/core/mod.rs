// Domain types shared across layers

pub mod errors;
pub mod models;
pub mod resilience;
