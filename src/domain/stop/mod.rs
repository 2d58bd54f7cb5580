mod model;
mod repository;

pub use model::{Stop, StopCompletion, StopPaymentStatus, StopStatus};
pub use repository::{StopEtaUpdate, StopRepository};
