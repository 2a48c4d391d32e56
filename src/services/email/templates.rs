use crate::services::email::OutgoingEmail;
use crate::services::otp::TokenPurpose;

/// Render the message carrying a one-time code.
pub fn otp_email(
    to: &str,
    to_name: Option<&str>,
    purpose: TokenPurpose,
    code: &str,
    expiry_minutes: i64,
) -> OutgoingEmail {
    let (subject, action) = match purpose {
        TokenPurpose::EmailVerification => ("Verify your email address", "verify your email address"),
        TokenPurpose::PasswordReset => ("Reset your password", "reset your password"),
        TokenPurpose::AdminRegistration => ("Confirm your admin registration", "complete your admin registration"),
        TokenPurpose::PhoneVerification => ("Verify your phone number", "verify your phone number"),
    };

    let greeting = match to_name {
        Some(name) => format!("Hello {},", name),
        None => "Hello,".to_string(),
    };

    let text_body = format!(
        "{greeting}\n\nUse the code {code} to {action}. It expires in {expiry_minutes} minutes.\n\n\
         If you did not request this, you can ignore this email."
    );

    let html_body = format!(
        "<p>{greeting}</p>\
         <p>Use the code below to {action}. It expires in {expiry_minutes} minutes.</p>\
         <p style=\"font-size:24px;font-weight:bold;letter-spacing:4px\">{code}</p>\
         <p>If you did not request this, you can ignore this email.</p>",
        greeting = escape_html(&greeting),
    );

    OutgoingEmail {
        to: to.to_string(),
        to_name: to_name.map(str::to_string),
        subject: subject.to_string(),
        html_body,
        text_body,
    }
}

fn escape_html(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
