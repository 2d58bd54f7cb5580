mod service;

pub use service::{LoginOutcome, SessionService, TokenPair};
