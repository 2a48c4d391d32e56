pub mod controller;
pub mod crud;
pub mod interface;
pub mod memory;
pub mod model;
pub mod routes;
pub mod schema;
pub mod service;

pub use crud::MySqlAccountRepository;
pub use interface::{AccountRepository, AdminChange, AdminWrite, SuperAdminCounts};
pub use memory::InMemoryAccountRepository;
pub use model::{Account, Admin, AdminRole, User, Vendor};
pub use routes::auth_routes;
pub use service::AccountService;
