mod model;
mod repository;

pub use model::RefreshTokenRecord;
pub use repository::RefreshTokenRepository;
