pub mod email;
pub mod hashing;
pub mod jwt;
pub mod metrics;
pub mod otp;
pub mod push;
pub mod rate_limit;
pub mod security;
pub mod sweeper;
