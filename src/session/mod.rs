//! Dashboard client session handling

mod connection;
mod manager;

pub use connection::{ClientHandle, ClientSession};
pub use manager::SessionManager;
