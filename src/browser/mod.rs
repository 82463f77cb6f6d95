//! Browser automation layer
//!
//! One `BrowserSession` wraps one Chrome instance plus one page, scoped to a
//! single login attempt.

mod errors;
mod session;

pub use errors::BrowserError;
pub use session::BrowserSession;
