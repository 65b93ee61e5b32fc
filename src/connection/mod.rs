// src/connection/mod.rs

//! Manages the lifecycle of a single hub connection: registration on connect,
//! frame dispatch while open, and unregistration on disconnect.

mod guard;
mod handler;
mod session;

pub use guard::ConnectionGuard;
pub use handler::ConnectionHandler;
pub use session::SessionState;
