pub mod clock;
pub mod collector;
pub mod config;
pub mod driver;
pub mod error;
pub mod export;
pub mod extract;
pub mod gate;
pub mod locator;
pub mod models;
pub mod session;
pub mod store;
pub mod walker;
