//! HTTP modules: one directory per resource

pub mod addresses;
pub mod auth;
pub mod depots;
pub mod events;
pub mod health;
pub mod metrics;
pub mod payments;
pub mod routes;
pub mod settings;
pub mod users;
