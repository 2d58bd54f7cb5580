mod model;
mod repository;

pub use model::{Payment, PaymentMethod, PaymentVerification};
pub use repository::PaymentRepository;
