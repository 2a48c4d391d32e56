mod http;
mod sender;
pub mod templates;

pub use http::HttpEmailSender;
pub use sender::{EmailError, EmailReceipt, EmailSender, LogEmailSender, OutgoingEmail};
