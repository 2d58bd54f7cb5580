mod model;
mod repository;

pub use model::Depot;
pub use repository::DepotRepository;
