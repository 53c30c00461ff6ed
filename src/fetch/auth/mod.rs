mod session_token;

pub use session_token::{AUTH_HEADER, SessionToken};
