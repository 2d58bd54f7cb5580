mod model;
mod repository;

pub use model::{Address, GeocodeStatus};
pub use repository::AddressRepository;
