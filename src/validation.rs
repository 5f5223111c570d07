//! Sign-up and login form validation.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
        .expect("email pattern should compile")
});

static PHONE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{10}$").expect("phone pattern should compile"));

/// Minimum password length.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Why a field was rejected. The message is shown under the field as is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[allow(missing_docs)]
pub enum ValidationError {
    #[error("Email is required")]
    EmailRequired,
    #[error("Please enter a valid email address")]
    EmailInvalid,
    #[error("Password is required")]
    PasswordRequired,
    #[error("Password must be at least 6 characters")]
    PasswordTooShort,
    #[error("Mobile number is required")]
    PhoneRequired,
    #[error("Please enter a valid 10-digit mobile number")]
    PhoneInvalid,
    #[error("Name is required")]
    NameRequired,
}

/// Email must be present and look like `local@domain.tld`.
pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    if email.trim().is_empty() {
        return Err(ValidationError::EmailRequired);
    }
    if !EMAIL_PATTERN.is_match(email) {
        return Err(ValidationError::EmailInvalid);
    }
    Ok(())
}

/// Password must be present and at least [`MIN_PASSWORD_LEN`] characters.
pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.is_empty() {
        return Err(ValidationError::PasswordRequired);
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ValidationError::PasswordTooShort);
    }
    Ok(())
}

/// Mobile number must be exactly ten digits.
pub fn validate_phone(phone: &str) -> Result<(), ValidationError> {
    if phone.trim().is_empty() {
        return Err(ValidationError::PhoneRequired);
    }
    if !PHONE_PATTERN.is_match(phone) {
        return Err(ValidationError::PhoneInvalid);
    }
    Ok(())
}

/// Name must contain something other than whitespace.
pub fn validate_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::NameRequired);
    }
    Ok(())
}

/// Per-field outcome of the login form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginErrors {
    /// Email field error
    pub email: Option<ValidationError>,
    /// Password field error
    pub password: Option<ValidationError>,
}

impl LoginErrors {
    /// No field has an error.
    pub fn is_valid(&self) -> bool {
        self.email.is_none() && self.password.is_none()
    }
}

/// Validate every login field.
pub fn validate_login_form(email: &str, password: &str) -> LoginErrors {
    LoginErrors {
        email: validate_email(email).err(),
        password: validate_password(password).err(),
    }
}

/// Per-field outcome of the sign-up form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignUpErrors {
    /// Name field error
    pub name: Option<ValidationError>,
    /// Email field error
    pub email: Option<ValidationError>,
    /// Mobile number field error
    pub mobile: Option<ValidationError>,
    /// Password field error
    pub password: Option<ValidationError>,
}

impl SignUpErrors {
    /// No field has an error.
    pub fn is_valid(&self) -> bool {
        self.name.is_none()
            && self.email.is_none()
            && self.mobile.is_none()
            && self.password.is_none()
    }
}

/// Validate every sign-up field.
pub fn validate_sign_up_form(name: &str, email: &str, phone: &str, password: &str) -> SignUpErrors {
    SignUpErrors {
        name: validate_name(name).err(),
        email: validate_email(email).err(),
        mobile: validate_phone(phone).err(),
        password: validate_password(password).err(),
    }
}
