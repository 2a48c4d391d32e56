mod engine;
mod memory;
mod mysql;
mod store;
mod types;

pub use engine::{hash_bearer, OtpEngine, DEFAULT_OTP_EXPIRY_MINUTES, OTP_MAX_ATTEMPTS};
pub(crate) use engine::normalize_email;
pub use memory::InMemoryTokenStore;
pub use mysql::MySqlTokenStore;
pub use store::TokenStore;
pub use types::{
    IssuedOtp, OtpError, OtpLookup, OtpTarget, SubjectKind, SubjectRef, TokenPurpose,
    VerificationToken,
};
