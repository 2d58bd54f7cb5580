//! Outbound HTTP providers: mapping (travel times) and push

pub mod mapping;
pub mod push;

pub use mapping::GoogleMapsProvider;
pub use push::FcmClient;
