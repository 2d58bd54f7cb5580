mod model;
mod repository;

pub use model::{DriverFix, Route, RouteStatus, TrackingPoint};
pub use repository::{RouteFilter, RouteRepository};
