//! Authentication
//!
//! - [`token`]: the token issue and refresh endpoints
//! - [`controller`]: login, registration, logout and session bootstrap

pub mod controller;
pub mod token;

pub use controller::AuthController;
pub use token::{TokenEndpoint, TokenRefresher};
