//! Field-level rules shared by every marketplace entity.
//!
//! Setters across the domain validate first and commit second, so a failed
//! assignment never disturbs the value already held.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

/// Error raised when a field value fails its format, emptiness, or range rule.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },
    #[error("{field} is too long: at most {max} characters allowed, found {found}")]
    TooLong {
        field: &'static str,
        max: usize,
        found: usize,
    },
    #[error("{field} must {rule}")]
    Format {
        field: &'static str,
        rule: &'static str,
    },
    #[error("{field} {detail}")]
    Range { field: &'static str, detail: String },
    #[error("password must {0}")]
    WeakPassword(PasswordRule),
}

impl ValidationError {
    /// Name of the field whose rule failed.
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::Empty { field }
            | ValidationError::TooLong { field, .. }
            | ValidationError::Format { field, .. }
            | ValidationError::Range { field, .. } => field,
            ValidationError::WeakPassword(_) => "password",
        }
    }
}

/// Password policy rules, checked in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordRule {
    MinimumLength,
    Uppercase,
    Lowercase,
    Digit,
    SpecialCharacter,
}

impl fmt::Display for PasswordRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            PasswordRule::MinimumLength => "be at least 8 characters long",
            PasswordRule::Uppercase => "contain an uppercase letter",
            PasswordRule::Lowercase => "contain a lowercase letter",
            PasswordRule::Digit => "contain a number",
            PasswordRule::SpecialCharacter => "contain a special character",
        };
        f.write_str(text)
    }
}

pub(crate) const PASSWORD_MIN_LENGTH: usize = 8;
pub(crate) const PASSWORD_SPECIALS: &str = "!@#$%^&*(),.?\":{}|<>";

/// Check a candidate password against the policy, reporting the first rule it breaks.
pub fn check_password_policy(candidate: &str) -> Result<(), ValidationError> {
    let failed = if candidate.chars().count() < PASSWORD_MIN_LENGTH {
        Some(PasswordRule::MinimumLength)
    } else if !candidate.chars().any(|c| c.is_ascii_uppercase()) {
        Some(PasswordRule::Uppercase)
    } else if !candidate.chars().any(|c| c.is_ascii_lowercase()) {
        Some(PasswordRule::Lowercase)
    } else if !candidate.chars().any(|c| c.is_ascii_digit()) {
        Some(PasswordRule::Digit)
    } else if !candidate.chars().any(|c| PASSWORD_SPECIALS.contains(c)) {
        Some(PasswordRule::SpecialCharacter)
    } else {
        None
    };

    match failed {
        Some(rule) => Err(ValidationError::WeakPassword(rule)),
        None => Ok(()),
    }
}

/// Anchored formats used by the entity setters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Pattern {
    PersonName,
    Phone,
    Email,
    Username,
    LettersAndSpaces,
    Bsb,
    BankAccount,
    Abn,
    CardNumber,
    CardExpiry,
    SecurityCode,
}

impl Pattern {
    const ALL: [Pattern; 11] = [
        Pattern::PersonName,
        Pattern::Phone,
        Pattern::Email,
        Pattern::Username,
        Pattern::LettersAndSpaces,
        Pattern::Bsb,
        Pattern::BankAccount,
        Pattern::Abn,
        Pattern::CardNumber,
        Pattern::CardExpiry,
        Pattern::SecurityCode,
    ];

    const fn source(self) -> &'static str {
        match self {
            Pattern::PersonName => r"^[A-Za-z' -]+$",
            Pattern::Phone => r"^\+?[0-9\s-]{7,15}$",
            Pattern::Email => r"^[\w.-]+@[\w.-]+\.\w+$",
            Pattern::Username => r"^[A-Za-z0-9_.-]{3,20}$",
            Pattern::LettersAndSpaces => r"^[A-Za-z\s]+$",
            Pattern::Bsb => r"^[0-9]{6}$",
            Pattern::BankAccount => r"^[0-9]{6,10}$",
            Pattern::Abn => r"^[0-9]{11}$",
            Pattern::CardNumber => r"^[0-9]{13,19}$",
            Pattern::CardExpiry => r"^(0[1-9]|1[0-2])/[0-9]{2}$",
            Pattern::SecurityCode => r"^[0-9]{3,4}$",
        }
    }

    const fn rule(self) -> &'static str {
        match self {
            Pattern::PersonName => "contain only letters, spaces, apostrophes, or hyphens",
            Pattern::Phone => "be 7-15 digits, spaces, or hyphens with an optional leading +",
            Pattern::Email => "be a valid email address",
            Pattern::Username => {
                "be 3-20 characters of letters, numbers, dots, underscores, or hyphens"
            }
            Pattern::LettersAndSpaces => "contain only letters and spaces",
            Pattern::Bsb => "be a 6-digit number",
            Pattern::BankAccount => "be between 6 and 10 digits",
            Pattern::Abn => "be an 11-digit number",
            Pattern::CardNumber => "be between 13 and 19 digits",
            Pattern::CardExpiry => "be in MM/YY format",
            Pattern::SecurityCode => "be a 3 or 4-digit number",
        }
    }

    fn regex(self) -> Option<&'static Regex> {
        static COMPILED: OnceLock<[Option<Regex>; 11]> = OnceLock::new();
        let compiled =
            COMPILED.get_or_init(|| Pattern::ALL.map(|pattern| Regex::new(pattern.source()).ok()));
        let index = Pattern::ALL.iter().position(|pattern| *pattern == self)?;
        compiled.get(index).and_then(Option::as_ref)
    }

    fn is_match(self, value: &str) -> bool {
        self.regex().is_some_and(|regex| regex.is_match(value))
    }
}

/// Reject values that are empty once surrounding whitespace is removed.
pub(crate) fn required(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::Empty { field })
    } else {
        Ok(())
    }
}

/// Non-empty text with a character cap.
pub(crate) fn bounded(field: &'static str, value: &str, max: usize) -> Result<(), ValidationError> {
    required(field, value)?;
    let found = value.chars().count();
    if found > max {
        return Err(ValidationError::TooLong { field, max, found });
    }
    Ok(())
}

/// Non-empty text matching an anchored pattern.
pub(crate) fn formatted(
    field: &'static str,
    value: &str,
    pattern: Pattern,
) -> Result<(), ValidationError> {
    required(field, value)?;
    if pattern.is_match(value) {
        Ok(())
    } else {
        Err(ValidationError::Format {
            field,
            rule: pattern.rule(),
        })
    }
}

/// Finite, non-negative monetary amount.
pub(crate) fn non_negative_amount(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::Range {
            field,
            detail: "must be a finite number".to_string(),
        });
    }
    if value < 0.0 {
        return Err(ValidationError::Range {
            field,
            detail: format!("must be non-negative (found {value})"),
        });
    }
    Ok(())
}
