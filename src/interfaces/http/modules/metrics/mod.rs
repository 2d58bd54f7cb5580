mod handlers;
mod middleware;

pub use handlers::*;
pub use middleware::*;
