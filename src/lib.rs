pub mod cache;
pub mod clock;
pub mod commands;
pub mod config;
pub mod data;
pub mod error;
pub mod health;
pub mod routes;
pub mod savings;
pub mod segmentation;
pub mod server;
pub mod shutdown;
pub mod test_utils;
pub mod utils;

pub use config::Config;
pub use server::Server;
