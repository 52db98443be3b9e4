//! Instructor sign-in. The domain check is advisory; the passcode provider
//! is the only thing that actually admits someone.

use std::collections::HashMap;
use std::sync::Mutex;

use rand::Rng;

pub const CODE_LENGTH: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("Enter a valid email address.")]
    InvalidEmail,
    #[error("Teacher email must end with {0}.")]
    WrongDomain(String),
    #[error("Enter the 6 digit code from your email.")]
    MalformedCode,
    #[error("Request a code first.")]
    NoCodeRequested,
    #[error("That code is not valid. Request a new one.")]
    CodeRejected,
}

/// Trimmed email, if it looks like an address under `domain`.
pub fn validate_email(email: &str, domain: &str) -> Result<String, AuthError> {
    let email = email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(AuthError::InvalidEmail);
    }
    if !email.to_lowercase().ends_with(&domain.to_lowercase()) {
        return Err(AuthError::WrongDomain(domain.to_string()));
    }
    Ok(email.to_string())
}

pub fn validate_code(code: &str) -> Result<String, AuthError> {
    let code = code.trim();
    if code.len() != CODE_LENGTH || !code.chars().all(|c| c.is_ascii_digit()) {
        return Err(AuthError::MalformedCode);
    }
    Ok(code.to_string())
}

/// Passwordless one-time-code provider.
pub trait PasscodeProvider: Send + Sync {
    fn send_code(&self, email: &str) -> Result<(), AuthError>;
    fn verify_code(&self, email: &str, code: &str) -> Result<(), AuthError>;
}

/// Issues codes into the log instead of a mailbox. Each code works once.
#[derive(Default)]
pub struct LoggedPasscodes {
    issued: Mutex<HashMap<String, String>>,
}

impl LoggedPasscodes {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    fn issued_code(&self, email: &str) -> Option<String> {
        self.issued
            .lock()
            .ok()
            .and_then(|issued| issued.get(&email.to_lowercase()).cloned())
    }
}

impl PasscodeProvider for LoggedPasscodes {
    fn send_code(&self, email: &str) -> Result<(), AuthError> {
        let code = format!("{:06}", rand::thread_rng().gen_range(0..1_000_000));
        log::info!("Sign-in code for {}: {}", email, code);
        if let Ok(mut issued) = self.issued.lock() {
            issued.insert(email.to_lowercase(), code);
        }
        Ok(())
    }

    fn verify_code(&self, email: &str, code: &str) -> Result<(), AuthError> {
        let mut issued = self.issued.lock().map_err(|_| AuthError::CodeRejected)?;
        match issued.get(&email.to_lowercase()) {
            None => Err(AuthError::NoCodeRequested),
            Some(expected) if expected == code => {
                issued.remove(&email.to_lowercase());
                Ok(())
            }
            Some(_) => Err(AuthError::CodeRejected),
        }
    }
}

/// Validates the address, then asks the provider for a code.
pub fn request_code(
    provider: &dyn PasscodeProvider,
    email: &str,
    domain: &str,
) -> Result<String, AuthError> {
    let email = validate_email(email, domain)?;
    provider.send_code(&email)?;
    Ok(email)
}

pub fn sign_in(
    provider: &dyn PasscodeProvider,
    email: &str,
    code: &str,
    domain: &str,
) -> Result<String, AuthError> {
    let email = validate_email(email, domain)?;
    let code = validate_code(code)?;
    provider.verify_code(&email, &code)?;
    log::info!("Instructor {} signed in", email);
    Ok(email)
}
