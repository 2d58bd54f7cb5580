pub mod geo;
pub mod shutdown;
pub mod types;
pub mod utils;

pub use shutdown::*;
pub use types::*;
