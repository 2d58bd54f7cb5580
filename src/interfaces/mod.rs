//! Interface layer - delivery mechanisms (HTTP REST + SSE)

pub mod http;
