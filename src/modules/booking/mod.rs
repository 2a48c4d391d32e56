pub mod controller;
pub mod crud;
pub mod interface;
pub mod machine;
pub mod memory;
pub mod model;
pub mod routes;
pub mod schema;

pub use crud::MySqlBookingRepository;
pub use interface::{ActorScope, BookingPatch, BookingRepository, TransitionRequest};
pub use machine::{BookingError, BookingStateMachine};
pub use memory::InMemoryBookingRepository;
pub use model::{Booking, BookingStatus, PaymentStatus};
pub use routes::{admin_booking_routes, booking_routes};
