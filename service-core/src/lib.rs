//! service-core: shared HTTP infrastructure for the studio backend.
pub mod config;
pub mod error;
pub mod middleware;
pub mod observability;
