pub mod memory;
pub mod mysql;
pub mod registry;
pub mod types;

pub use memory::InMemoryDeviceTokenRegistry;
pub use mysql::MySqlDeviceTokenRegistry;
pub use registry::{DeviceTokenRegistry, MAX_DEVICES_PER_SUBJECT};
pub use types::{DevicePlatform, DeviceToken};
