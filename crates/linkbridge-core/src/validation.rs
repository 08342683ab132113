//! RECEIVE-stage input checks
//!
//! Syntax only. Nothing here touches the network, so a malformed job is
//! rejected before any collaborator cost is incurred.

use crate::error::InputValidationError;
use crate::types::JobRequest;
use once_cell::sync::Lazy;
use regex::Regex;

/// Longest accepted anchor label, in characters
pub const MAX_LABEL_CHARS: usize = 100;

static DOMAIN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?\.)+[a-z]{2,63}$")
        .expect("domain pattern is valid")
});

static URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^https?://([^/\s:?#@]+)(:\d{1,5})?([/?#]\S*)?$").expect("url pattern is valid")
});

/// Check all three inputs, in request order
///
/// # Errors
/// The first malformed input
pub fn validate_request(request: &JobRequest) -> Result<(), InputValidationError> {
    validate_publisher(&request.publisher)?;
    validate_url(&request.target_url)?;
    validate_label(&request.anchor_label)
}

/// Bare domain, or an http(s) URL whose host is one
///
/// # Errors
/// [`InputValidationError::InvalidDomain`]
pub fn validate_publisher(publisher: &str) -> Result<(), InputValidationError> {
    let trimmed = publisher.trim();
    let ok = if URL.is_match(trimmed) {
        validate_url(trimmed).is_ok()
    } else {
        is_domain(trimmed)
    };
    if ok {
        Ok(())
    } else {
        Err(InputValidationError::InvalidDomain(publisher.to_string()))
    }
}

/// Absolute http(s) URL with a valid host
///
/// # Errors
/// [`InputValidationError::InvalidUrl`]
pub fn validate_url(url: &str) -> Result<(), InputValidationError> {
    let valid_host = URL
        .captures(url.trim())
        .and_then(|caps| caps.get(1))
        .is_some_and(|host| is_domain(host.as_str()));
    if valid_host {
        Ok(())
    } else {
        Err(InputValidationError::InvalidUrl(url.to_string()))
    }
}

/// Non-blank, single line, no link markup, at most [`MAX_LABEL_CHARS`]
///
/// # Errors
/// [`InputValidationError::EmptyLabel`], [`InputValidationError::LabelTooLong`]
/// or [`InputValidationError::LabelCharacters`]
pub fn validate_label(label: &str) -> Result<(), InputValidationError> {
    let trimmed = label.trim();
    if trimmed.is_empty() {
        return Err(InputValidationError::EmptyLabel);
    }
    let len = trimmed.chars().count();
    if len > MAX_LABEL_CHARS {
        return Err(InputValidationError::LabelTooLong {
            len,
            max: MAX_LABEL_CHARS,
        });
    }
    if trimmed.chars().any(|c| matches!(c, '\n' | '\r' | '[' | ']')) {
        return Err(InputValidationError::LabelCharacters(trimmed.to_string()));
    }
    Ok(())
}

fn is_domain(candidate: &str) -> bool {
    let candidate = candidate.trim_end_matches('.');
    candidate.len() <= 253 && DOMAIN.is_match(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_domains_and_site_urls() {
        for publisher in [
            "garden-weekly.com",
            "News.Example.co.uk",
            "https://garden-weekly.com/",
        ] {
            assert_eq!(validate_publisher(publisher), Ok(()), "{publisher}");
        }
    }

    #[test]
    fn rejects_malformed_domains() {
        for publisher in ["", "localhost", "-bad.com", "spaces in.com", "ftp://x.com"] {
            assert_eq!(
                validate_publisher(publisher),
                Err(InputValidationError::InvalidDomain(publisher.to_string())),
                "{publisher}"
            );
        }
    }

    #[test]
    fn target_must_be_absolute_http() {
        assert!(validate_url("https://www.greenroot-supply.com/raised-bed-soil?ref=1").is_ok());
        assert!(validate_url("http://shop.example.com:8080/p").is_ok());
        assert!(validate_url("greenroot-supply.com/raised-bed-soil").is_err());
        assert!(validate_url("https:///missing-host").is_err());
        assert!(validate_url("https://user@evil.com").is_err());
        assert!(validate_url("mailto:someone@example.com").is_err());
    }

    #[test]
    fn label_rules() {
        assert_eq!(validate_label("raised bed soil mix"), Ok(()));
        assert_eq!(validate_label("   "), Err(InputValidationError::EmptyLabel));
        assert_eq!(
            validate_label(&"a".repeat(101)),
            Err(InputValidationError::LabelTooLong { len: 101, max: 100 })
        );
        assert!(matches!(
            validate_label("[soil](https://x.com)"),
            Err(InputValidationError::LabelCharacters(_))
        ));
        assert!(validate_label("two\nlines").is_err());
    }

    #[test]
    fn request_checks_publisher_first() {
        let request = JobRequest::new("not a domain", "also bad", "");
        assert!(matches!(
            validate_request(&request),
            Err(InputValidationError::InvalidDomain(_))
        ));
    }
}
