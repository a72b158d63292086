//! Input validation for ticket creation.
//!
//! Validation runs before any write: a failing request must leave no
//! partial state behind.

use crate::error::{DomainError, DomainResult, FieldError};

/// Minimum length for ticket content, after trimming.
pub const MIN_CONTENT_LEN: usize = 10;

/// Validate ticket content (non-empty, length floor).
pub fn validate_content(content: &str) -> Result<(), FieldError> {
    if content.trim().chars().count() < MIN_CONTENT_LEN {
        return Err(FieldError::new(
            "content",
            format!("Content must be at least {MIN_CONTENT_LEN} characters long"),
        ));
    }
    Ok(())
}

/// Validate a customer email: well-formed or empty.
///
/// Structural check only (single `@`, non-empty local part, dotted domain);
/// full RFC parsing is out of scope for a triage dashboard.
pub fn validate_email(email: &str) -> Result<(), FieldError> {
    if email.is_empty() {
        return Ok(());
    }

    let malformed = || FieldError::new("customerEmail", "Invalid email");

    let mut parts = email.split('@');
    let (local, domain) = match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => (local, domain),
        _ => return Err(malformed()),
    };

    if local.is_empty() || domain.is_empty() || email.contains(char::is_whitespace) {
        return Err(malformed());
    }
    // Domain needs an interior dot: "a@b" is not deliverable mail.
    let dot = match domain.find('.') {
        Some(i) => i,
        None => return Err(malformed()),
    };
    if dot == 0 || dot == domain.len() - 1 {
        return Err(malformed());
    }

    Ok(())
}

/// Validate all creation inputs at once, collecting every field error.
pub fn validate_new_ticket(content: &str, customer_email: Option<&str>) -> DomainResult<()> {
    let mut errors = Vec::new();
    if let Err(e) = validate_content(content) {
        errors.push(e);
    }
    if let Some(email) = customer_email {
        if let Err(e) = validate_email(email) {
            errors.push(e);
        }
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(DomainError::validation(errors))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn short_content_is_rejected() {
        let err = validate_content("too short").unwrap_err();
        assert_eq!(err.field, "content");
    }

    #[test]
    fn whitespace_padding_does_not_count() {
        assert!(validate_content("   hi   \t\n        ").is_err());
        assert!(validate_content("exactly ten").is_ok());
    }

    #[test]
    fn empty_email_is_allowed() {
        assert!(validate_email("").is_ok());
    }

    #[test]
    fn malformed_emails_are_rejected() {
        for bad in [
            "invalid-email",
            "@nodomain.com",
            "nolocal@",
            "two@@ats.com",
            "no@dots",
            "trailing@dot.",
            "spa ce@mail.com",
        ] {
            assert!(validate_email(bad).is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn plausible_emails_are_accepted() {
        for good in ["api@test.com", "a.b+tag@sub.example.org", "x@y.io"] {
            assert!(validate_email(good).is_ok(), "rejected {good:?}");
        }
    }

    #[test]
    fn all_field_errors_are_collected() {
        let err = validate_new_ticket("short", Some("not-an-email")).unwrap_err();
        match err {
            DomainError::Validation(errors) => {
                assert_eq!(errors.len(), 2);
                assert!(errors.iter().any(|e| e.field == "content"));
                assert!(errors.iter().any(|e| e.field == "customerEmail"));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    proptest! {
        #[test]
        fn any_long_enough_content_passes(s in "[a-zA-Z0-9 ]{10,200}") {
            // Guard: trimming may shave the count below the floor.
            prop_assume!(s.trim().chars().count() >= MIN_CONTENT_LEN);
            prop_assert!(validate_content(&s).is_ok());
        }
    }
}
