//! Auth flows and declarative field validation.
//!
//! Login and signup share one rule table: each field maps to a small
//! descriptor (required flag, minimum length, patterns) evaluated by a
//! generic validator on blur and on submit. Submission stays disabled while
//! any field fails.
//!
//! Server-side rejections are blamed on a field by HTTP status code
//! (409 → email taken, 401 → wrong password, 404 → unknown account) instead
//! of the error-text matching the legacy client did.

use std::sync::LazyLock;

use regex::Regex;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use tracing::{info, instrument};

use tableside_core::{AccessToken, Email};

use crate::api::types::ProfileUpdate;
use crate::api::{ApiError, OrderApiClient};
use crate::cart::CartStore;
use crate::error::{ClientError, clear_sentry_user, set_sentry_user};
use crate::storage::{self, KeyValueStorage, keys};

/// Form fields the validator knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Email,
    Name,
    Password,
    ConfirmPassword,
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Email => write!(f, "email"),
            Self::Name => write!(f, "name"),
            Self::Password => write!(f, "password"),
            Self::ConfirmPassword => write!(f, "confirm password"),
        }
    }
}

/// Client-side validation failure for a single field.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// The field is required and empty.
    #[error("{0} is required")]
    Required(Field),

    /// The field is shorter than the rule allows.
    #[error("{field} must be at least {min} characters")]
    TooShort {
        /// Field that failed.
        field: Field,
        /// Minimum length from the rule table.
        min: usize,
    },

    /// The field failed a pattern rule.
    #[error("{field} {message}")]
    Pattern {
        /// Field that failed.
        field: Field,
        /// Rule's inline message.
        message: &'static str,
    },

    /// Password and confirmation differ.
    #[error("passwords do not match")]
    PasswordMismatch,
}

impl ValidationError {
    /// Which field's inline error region should render this message.
    #[must_use]
    pub const fn field(&self) -> Field {
        match self {
            Self::Required(field) => *field,
            Self::TooShort { field, .. } | Self::Pattern { field, .. } => *field,
            Self::PasswordMismatch => Field::ConfirmPassword,
        }
    }
}

/// A pattern a field value must match, with its inline message.
struct PatternRule {
    regex: Regex,
    message: &'static str,
}

/// Declarative rule descriptor for one field.
struct FieldRules {
    required: bool,
    min_len: usize,
    patterns: Vec<PatternRule>,
}

#[allow(clippy::unwrap_used)] // the patterns are literals, checked by tests
static RULE_TABLE: LazyLock<Vec<(Field, FieldRules)>> = LazyLock::new(|| {
    vec![
        (
            Field::Email,
            FieldRules {
                required: true,
                min_len: 0,
                patterns: vec![PatternRule {
                    regex: Regex::new(r"^[^@\s]+@[^@\s]+$").unwrap(),
                    message: "must be a valid email address",
                }],
            },
        ),
        (
            Field::Name,
            FieldRules {
                required: true,
                min_len: 2,
                patterns: vec![],
            },
        ),
        (
            Field::Password,
            FieldRules {
                required: true,
                min_len: 8,
                patterns: vec![
                    PatternRule {
                        regex: Regex::new(r"[A-Za-z]").unwrap(),
                        message: "must contain a letter",
                    },
                    PatternRule {
                        regex: Regex::new(r"\d").unwrap(),
                        message: "must contain a digit",
                    },
                ],
            },
        ),
        (
            Field::ConfirmPassword,
            FieldRules {
                required: true,
                min_len: 0,
                patterns: vec![],
            },
        ),
    ]
});

fn rules_for(field: Field) -> &'static FieldRules {
    // The table covers every Field variant
    RULE_TABLE
        .iter()
        .find(|(f, _)| *f == field)
        .map_or_else(|| unreachable!("missing rule for {field}"), |(_, r)| r)
}

/// Evaluate one field against its rule descriptor (blur-time validation).
///
/// # Errors
///
/// Returns the first rule the value violates, in required → length →
/// pattern order.
pub fn validate_field(field: Field, value: &str) -> Result<(), ValidationError> {
    let rules = rules_for(field);

    if value.is_empty() {
        return if rules.required {
            Err(ValidationError::Required(field))
        } else {
            Ok(())
        };
    }

    // Characters, not bytes: a short multibyte password must not pass on
    // byte length alone
    if value.chars().count() < rules.min_len {
        return Err(ValidationError::TooShort {
            field,
            min: rules.min_len,
        });
    }

    for pattern in &rules.patterns {
        if !pattern.regex.is_match(value) {
            return Err(ValidationError::Pattern {
                field,
                message: pattern.message,
            });
        }
    }

    Ok(())
}

// =============================================================================
// Forms
// =============================================================================

/// Login sub-form.
#[derive(Clone)]
pub struct LoginForm {
    /// Entered email address.
    pub email: String,
    /// Entered password.
    pub password: SecretString,
}

impl LoginForm {
    /// All current violations (submit-time validation).
    #[must_use]
    pub fn violations(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        if let Err(e) = validate_field(Field::Email, &self.email) {
            errors.push(e);
        }
        // Login only requires the password to be present; complexity rules
        // apply when a password is being set
        if self.password.expose_secret().is_empty() {
            errors.push(ValidationError::Required(Field::Password));
        }
        errors
    }

    /// Whether the submit control is enabled.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.violations().is_empty()
    }
}

/// Signup sub-form.
#[derive(Clone)]
pub struct SignupForm {
    /// Entered email address.
    pub email: String,
    /// Entered display name.
    pub name: String,
    /// Entered password.
    pub password: SecretString,
    /// Password confirmation field.
    pub confirm_password: SecretString,
}

impl SignupForm {
    /// All current violations (submit-time validation).
    #[must_use]
    pub fn violations(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        for (field, value) in [
            (Field::Email, self.email.as_str()),
            (Field::Name, self.name.as_str()),
            (Field::Password, self.password.expose_secret()),
            (
                Field::ConfirmPassword,
                self.confirm_password.expose_secret(),
            ),
        ] {
            if let Err(e) = validate_field(field, value) {
                errors.push(e);
            }
        }
        if !self.confirm_password.expose_secret().is_empty()
            && self.password.expose_secret() != self.confirm_password.expose_secret()
        {
            errors.push(ValidationError::PasswordMismatch);
        }
        errors
    }

    /// Whether the submit control is enabled.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.violations().is_empty()
    }
}

/// Blame a server-side auth rejection on a form field by status code.
///
/// Returns the field whose inline error region should show the server's
/// message, or `None` for failures that are not about a specific field.
#[must_use]
pub fn blame_field(error: &ApiError) -> Option<Field> {
    match error.status()? {
        409 => Some(Field::Email),    // account already exists
        401 => Some(Field::Password), // wrong password
        404 => Some(Field::Email),    // unknown account
        _ => None,
    }
}

// =============================================================================
// Flows
// =============================================================================

fn first_violation(mut violations: Vec<ValidationError>) -> Option<ValidationError> {
    if violations.is_empty() {
        None
    } else {
        Some(violations.remove(0))
    }
}

/// Log in, persist the returned token, and tag the Sentry scope.
///
/// # Errors
///
/// Returns `ClientError::Validation` before any network call while the form
/// is invalid, and `ClientError::Api` when the server rejects the
/// credentials (see [`blame_field`]).
#[instrument(skip_all, fields(email = %form.email))]
pub async fn login(
    api: &OrderApiClient,
    storage: &dyn KeyValueStorage,
    form: &LoginForm,
) -> Result<AccessToken, ClientError> {
    if let Some(violation) = first_violation(form.violations()) {
        return Err(violation.into());
    }

    let email = parse_form_email(&form.email)?;
    let token = api.login(&email, &form.password).await?;
    storage::set_json(storage, keys::CURRENT_ACCESS_TOKEN, &token)?;
    set_sentry_user(token.email.as_str());
    info!("Logged in");
    Ok(token)
}

/// Create an account, persist the returned token, and tag the Sentry scope.
///
/// # Errors
///
/// Returns `ClientError::Validation` while the form is invalid and
/// `ClientError::Api` for server rejections (409 on duplicate email).
#[instrument(skip_all, fields(email = %form.email))]
pub async fn signup(
    api: &OrderApiClient,
    storage: &dyn KeyValueStorage,
    form: &SignupForm,
) -> Result<AccessToken, ClientError> {
    if let Some(violation) = first_violation(form.violations()) {
        return Err(violation.into());
    }

    let email = parse_form_email(&form.email)?;
    let token = api.signup(&email, &form.name, &form.password).await?;
    storage::set_json(storage, keys::CURRENT_ACCESS_TOKEN, &token)?;
    set_sentry_user(token.email.as_str());
    info!("Account created");
    Ok(token)
}

/// Update profile fields and/or the password.
///
/// # Errors
///
/// Returns `ClientError::Validation` if a new password fails the password
/// rules, otherwise propagates server failures.
#[instrument(skip_all, fields(email = %token.email))]
pub async fn update_profile(
    api: &OrderApiClient,
    token: &AccessToken,
    update: &ProfileUpdate,
) -> Result<(), ClientError> {
    if let Some(name) = &update.name {
        validate_field(Field::Name, name)?;
    }
    if let Some(password) = &update.password {
        validate_field(Field::Password, password.expose_secret())?;
    }
    api.update_user(token, update).await?;
    Ok(())
}

/// Delete the account and wipe all local session state.
///
/// # Errors
///
/// Propagates the server failure without touching local state, so the user
/// stays signed in when deletion did not happen.
#[instrument(skip_all)]
pub async fn delete_account(
    api: &OrderApiClient,
    storage: &dyn KeyValueStorage,
    cart: &mut CartStore,
) -> Result<(), ClientError> {
    let Some(token) = storage::get_json::<AccessToken>(storage, keys::CURRENT_ACCESS_TOKEN)?
    else {
        return Err(ClientError::Internal("not signed in".to_string()));
    };

    api.delete_account(&token).await?;

    cart.clear()?;
    storage.remove(keys::CURRENT_ACCESS_TOKEN)?;
    clear_sentry_user();
    info!(email = %token.email, "Account deleted");
    Ok(())
}

/// A form email that passed the rule table still has to parse into the
/// stricter [`Email`] type used on the wire.
fn parse_form_email(raw: &str) -> Result<Email, ClientError> {
    Email::parse(raw).map_err(|_| {
        ClientError::Validation(ValidationError::Pattern {
            field: Field::Email,
            message: "must be a valid email address",
        })
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn signup_form(email: &str, name: &str, password: &str, confirm: &str) -> SignupForm {
        SignupForm {
            email: email.to_string(),
            name: name.to_string(),
            password: SecretString::from(password),
            confirm_password: SecretString::from(confirm),
        }
    }

    #[test]
    fn test_required_fields_block_submission() {
        let form = signup_form("", "", "", "");
        assert!(!form.is_valid());

        let fields: Vec<Field> = form.violations().iter().map(ValidationError::field).collect();
        assert!(fields.contains(&Field::Email));
        assert!(fields.contains(&Field::Name));
        assert!(fields.contains(&Field::Password));
        assert!(fields.contains(&Field::ConfirmPassword));
    }

    #[test]
    fn test_submission_enabled_once_all_fields_pass() {
        let mut form = signup_form("diner@example.com", "Diner", "weak", "weak");
        assert!(!form.is_valid());

        form.password = SecretString::from("s3curepass");
        form.confirm_password = SecretString::from("s3curepass");
        assert!(form.is_valid());
    }

    #[test]
    fn test_password_complexity_rules() {
        assert_eq!(
            validate_field(Field::Password, "short1"),
            Err(ValidationError::TooShort {
                field: Field::Password,
                min: 8
            })
        );
        assert_eq!(
            validate_field(Field::Password, "12345678"),
            Err(ValidationError::Pattern {
                field: Field::Password,
                message: "must contain a letter"
            })
        );
        assert_eq!(
            validate_field(Field::Password, "justletters"),
            Err(ValidationError::Pattern {
                field: Field::Password,
                message: "must contain a digit"
            })
        );
        assert!(validate_field(Field::Password, "s3curepass").is_ok());
    }

    #[test]
    fn test_password_minimum_counts_characters_not_bytes() {
        // Two four-byte emoji: 8 bytes but 2 characters
        assert_eq!(
            validate_field(Field::Password, "🍜🍜"),
            Err(ValidationError::TooShort {
                field: Field::Password,
                min: 8
            })
        );
        // Eight characters with multibyte ones still pass
        assert!(validate_field(Field::Password, "päss w0rd").is_ok());
    }

    #[test]
    fn test_email_pattern() {
        assert!(validate_field(Field::Email, "diner@example.com").is_ok());
        assert!(validate_field(Field::Email, "not-an-email").is_err());
        assert!(validate_field(Field::Email, "two@@example.com").is_err());
    }

    #[test]
    fn test_password_mismatch_blames_confirmation() {
        let form = signup_form("diner@example.com", "Diner", "s3curepass", "s3curepass2");
        let violations = form.violations();
        assert_eq!(violations, vec![ValidationError::PasswordMismatch]);
        assert_eq!(violations.first().unwrap().field(), Field::ConfirmPassword);
    }

    #[test]
    fn test_login_form_skips_complexity_rules() {
        // Legacy accounts may have passwords that predate the current rules
        let form = LoginForm {
            email: "diner@example.com".to_string(),
            password: SecretString::from("old"),
        };
        assert!(form.is_valid());
    }

    #[test]
    fn test_blame_field_by_status() {
        let conflict = ApiError::Response {
            status: 409,
            message: "account already exists".to_string(),
        };
        assert_eq!(blame_field(&conflict), Some(Field::Email));

        let unauthorized = ApiError::Response {
            status: 401,
            message: "wrong password".to_string(),
        };
        assert_eq!(blame_field(&unauthorized), Some(Field::Password));

        let missing = ApiError::Response {
            status: 404,
            message: "no such account".to_string(),
        };
        assert_eq!(blame_field(&missing), Some(Field::Email));

        let server_fault = ApiError::Response {
            status: 500,
            message: "boom".to_string(),
        };
        assert_eq!(blame_field(&server_fault), None);
    }
}
