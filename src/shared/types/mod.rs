pub mod errors;
pub mod pagination;

pub use errors::{AppError, DomainError, DomainResult, InfraError};
pub use pagination::{PaginatedResult, PaginationParams};
