pub mod auth;
pub mod categories;
pub mod jobs;
pub mod locations;
pub mod metrics;
pub mod payments;
pub mod photos;
pub mod users;
