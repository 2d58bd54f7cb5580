mod types;

pub use types::RouteEvent;
