//! Field validators.
//!
//! Each validator sanitizes its input and returns a [`Validation`]: either the
//! cleaned value or a reason phrased for the end user. Validators never fail
//! for malformed input; rejection is a value, not an error.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;
use url::Url;

use crate::security::sanitize::{sanitize_text, sanitize_text_with_formatting};

pub const NAME_MAX_LEN: usize = 100;
pub const EMAIL_MAX_LEN: usize = 254;
pub const PHONE_MAX_LEN: usize = 30;
pub const SLUG_MAX_LEN: usize = 200;
pub const URL_MAX_LEN: usize = 2048;
pub const OBJECT_PATH_MAX_LEN: usize = 512;
pub const NUMBER_MAX_LEN: usize = 64;

pub const PHONE_MIN_DIGITS: usize = 10;
pub const PHONE_MAX_DIGITS: usize = 15;

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email pattern"));

static SLUG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").expect("valid slug pattern"));

/// Result of validating one field.
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub enum Validation<T> {
    Valid(T),
    Invalid(String),
}

impl<T> Validation<T> {
    pub fn is_valid(&self) -> bool {
        matches!(self, Validation::Valid(_))
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Validation<U> {
        match self {
            Validation::Valid(value) => Validation::Valid(f(value)),
            Validation::Invalid(reason) => Validation::Invalid(reason),
        }
    }

    /// Attach the field name, turning a rejection into a [`FieldError`].
    pub fn into_result(self, field: &'static str) -> Result<T, FieldError> {
        match self {
            Validation::Valid(value) => Ok(value),
            Validation::Invalid(reason) => Err(FieldError { field, reason }),
        }
    }
}

/// A rejected field and the user-facing reason.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {reason}")]
pub struct FieldError {
    pub field: &'static str,
    pub reason: String,
}

/// Person name: at least `min_len` characters after sanitization.
pub fn validate_name(input: Option<&str>, min_len: usize) -> Validation<String> {
    validate_text("Name", input, min_len, NAME_MAX_LEN)
}

/// Single-line text with a label used in the rejection reason.
///
/// Input longer than `max_len` is truncated, not rejected.
pub fn validate_text(
    label: &str,
    input: Option<&str>,
    min_len: usize,
    max_len: usize,
) -> Validation<String> {
    let value = sanitize_text(input, max_len);
    if value.chars().count() < min_len {
        return Validation::Invalid(format!(
            "{} must be at least {} characters long",
            label, min_len
        ));
    }
    Validation::Valid(value)
}

/// Email address, lowercased.
pub fn validate_email(input: Option<&str>) -> Validation<String> {
    let value = sanitize_text(input, EMAIL_MAX_LEN).to_lowercase();
    if EMAIL.is_match(&value) {
        Validation::Valid(value)
    } else {
        Validation::Invalid("Please enter a valid email address".to_string())
    }
}

/// Sanitized `input`, or `None` when it is longer than `max_len` characters.
///
/// For values that must not be cut short (numbers, phone digits).
fn sanitize_within(input: Option<&str>, max_len: usize) -> Option<String> {
    let value = sanitize_text(input, usize::MAX);
    (value.chars().count() <= max_len).then_some(value)
}

/// Phone number. Punctuation and spacing are ignored; the value is the digits.
pub fn validate_phone(input: Option<&str>) -> Validation<String> {
    let invalid = || {
        Validation::Invalid(format!(
            "Phone number must contain between {} and {} digits",
            PHONE_MIN_DIGITS, PHONE_MAX_DIGITS
        ))
    };

    let Some(value) = sanitize_within(input, PHONE_MAX_LEN) else {
        return invalid();
    };
    let digits: String = value.chars().filter(char::is_ascii_digit).collect();

    if (PHONE_MIN_DIGITS..=PHONE_MAX_DIGITS).contains(&digits.len()) {
        Validation::Valid(digits)
    } else {
        invalid()
    }
}

/// Multi-line message bounded to `min_len..=max_len` characters.
pub fn validate_message(input: Option<&str>, min_len: usize, max_len: usize) -> Validation<String> {
    validate_long_text("Message", input, min_len, max_len)
}

/// Multi-line text that keeps formatting. Over-long input is rejected.
pub fn validate_long_text(
    label: &str,
    input: Option<&str>,
    min_len: usize,
    max_len: usize,
) -> Validation<String> {
    // One spare character distinguishes "exactly max" from "over max".
    let value = sanitize_text_with_formatting(input, max_len.saturating_add(1));
    let len = value.chars().count();

    if len < min_len {
        Validation::Invalid(format!(
            "{} must be at least {} characters long",
            label, min_len
        ))
    } else if len > max_len {
        Validation::Invalid(format!(
            "{} must be at most {} characters long",
            label, max_len
        ))
    } else {
        Validation::Valid(value)
    }
}

/// Lowercase URL slug, matched exactly (no trimming, case-sensitive).
pub fn validate_slug(input: Option<&str>) -> Validation<String> {
    match input {
        Some(slug) if slug.len() <= SLUG_MAX_LEN && SLUG.is_match(slug) => {
            Validation::Valid(slug.to_string())
        }
        _ => Validation::Invalid(
            "Slug may only contain lowercase letters, numbers and single hyphens".to_string(),
        ),
    }
}

/// Absolute `http` or `https` URL.
pub fn validate_url(input: Option<&str>) -> Validation<String> {
    let invalid = || Validation::Invalid("Please enter a valid http or https URL".to_string());

    let value = sanitize_text(input, URL_MAX_LEN);
    match Url::parse(&value) {
        Ok(url) if matches!(url.scheme(), "http" | "https") && url.has_host() => {
            Validation::Valid(url.to_string())
        }
        _ => invalid(),
    }
}

/// Optional number within `[min, max]`.
///
/// Absent or blank input is valid with no value: "not supplied" is distinct
/// from "supplied but wrong".
pub fn validate_number(
    label: &str,
    input: Option<&str>,
    min: Option<f64>,
    max: Option<f64>,
) -> Validation<Option<f64>> {
    let Some(raw) = sanitize_within(input, NUMBER_MAX_LEN) else {
        return Validation::Invalid(format!("{} must be a number", label));
    };
    if raw.is_empty() {
        return Validation::Valid(None);
    }

    let value = match raw.parse::<f64>() {
        Ok(v) if v.is_finite() => v,
        _ => return Validation::Invalid(format!("{} must be a number", label)),
    };

    if let Some(min) = min {
        if value < min {
            return Validation::Invalid(format!("{} must be at least {}", label, min));
        }
    }
    if let Some(max) = max {
        if value > max {
            return Validation::Invalid(format!("{} must be at most {}", label, max));
        }
    }

    Validation::Valid(Some(value))
}

/// Relative object-storage path made of safe file-name segments.
///
/// Empty segments collapse; `.` and `..` are rejected.
pub fn validate_object_path(input: Option<&str>) -> Validation<String> {
    let invalid = || {
        Validation::Invalid(
            "File path may only contain letters, numbers, '.', '_', '-' and '/'".to_string(),
        )
    };

    let Some(raw) = input else {
        return invalid();
    };
    if raw.len() > OBJECT_PATH_MAX_LEN {
        return invalid();
    }

    let mut segments = Vec::new();
    for segment in raw.split('/').filter(|s| !s.is_empty()) {
        let safe = segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
        if !safe || segment == "." || segment == ".." {
            return invalid();
        }
        segments.push(segment);
    }

    if segments.is_empty() {
        return invalid();
    }
    Validation::Valid(segments.join("/"))
}
