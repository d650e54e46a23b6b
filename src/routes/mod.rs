pub mod devices;
pub mod health;
pub mod savings;

pub use devices::create_device_routes;
pub use health::create_health_routes;
pub use savings::create_savings_routes;
