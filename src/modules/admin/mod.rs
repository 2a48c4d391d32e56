pub mod controller;
pub mod guard;
pub mod routes;
pub mod schema;
pub mod service;

pub use guard::{can_change_role, can_delete, AdminGuardError};
pub use routes::admin_routes;
pub use service::AdminService;
