use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::ValidationIssue;

pub const HANDLE_MAX_LEN: usize = 150;
pub const SLUG_MAX_LEN: usize = 50;
pub const GROUP_TITLE_MAX_LEN: usize = 100;
pub const IMAGE_REF_MAX_LEN: usize = 100;

static HANDLE_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\w.@+-]+$").expect("static regex"));
static SLUG_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[-a-zA-Z0-9_]+$").expect("static regex"));

/// Returns `true` if the handle is 1..=150 word characters or `.@+-`.
pub fn is_valid_handle(value: &str) -> bool {
    value.chars().count() <= HANDLE_MAX_LEN && HANDLE_PATTERN.is_match(value)
}

/// Returns `true` if the slug is 1..=50 ASCII letters, digits, hyphens or underscores.
pub fn is_valid_slug(value: &str) -> bool {
    value.len() <= SLUG_MAX_LEN && SLUG_PATTERN.is_match(value)
}

pub fn check_handle(field: &str, value: &str, issues: &mut Vec<ValidationIssue>) {
    if !is_valid_handle(value) {
        issues.push(ValidationIssue::new(
            field,
            "invalid",
            "handle may contain only letters, digits and @/./+/-/_ (at most 150 characters)",
        ));
    }
}

pub fn check_slug(field: &str, value: &str, issues: &mut Vec<ValidationIssue>) {
    if !is_valid_slug(value) {
        issues.push(ValidationIssue::new(
            field,
            "invalid",
            "slug may contain only letters, digits, hyphens and underscores (at most 50 characters)",
        ));
    }
}

/// Required free-text field: must contain something other than whitespace.
pub fn check_text(field: &str, value: &str, issues: &mut Vec<ValidationIssue>) {
    if value.trim().is_empty() {
        issues.push(ValidationIssue::new(field, "blank", "this field may not be blank"));
    }
}

pub fn check_max_chars(field: &str, value: &str, max: usize, issues: &mut Vec<ValidationIssue>) {
    if value.chars().count() > max {
        issues.push(ValidationIssue::new(
            field,
            "max_length",
            format!("ensure this field has no more than {max} characters"),
        ));
    }
}

/// Image references are opaque, but must be non-blank and bounded when present.
pub fn check_image_ref(field: &str, value: Option<&str>, issues: &mut Vec<ValidationIssue>) {
    if let Some(value) = value {
        check_text(field, value, issues);
        check_max_chars(field, value, IMAGE_REF_MAX_LEN, issues);
    }
}
