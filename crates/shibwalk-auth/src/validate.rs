//! Username shape validation.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{AuthError, AuthResult};

/// Accepted username shape: degree prefix followed by a seven digit student number.
pub const USERNAME_PATTERN: &str = "^[bmd][0-9]{7}$";

static USERNAME_REGEX: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(USERNAME_PATTERN));

/// Check a username against [`USERNAME_PATTERN`].
///
/// # Errors
///
/// Returns [`AuthError::InvalidUsername`] carrying the rejected value, or
/// [`AuthError::UsernamePattern`] if the pattern itself does not compile.
pub fn validate_username(username: &str) -> AuthResult<()> {
    check_username(USERNAME_REGEX.as_ref(), USERNAME_PATTERN, username)
}

fn check_username(
    compiled: Result<&Regex, &regex::Error>,
    pattern: &'static str,
    username: &str,
) -> AuthResult<()> {
    let regex = compiled.map_err(|source| AuthError::UsernamePattern {
        pattern,
        source: source.clone(),
    })?;

    if regex.is_match(username) {
        Ok(())
    } else {
        Err(AuthError::InvalidUsername {
            given: username.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PREFIXES: [&str; 3] = ["b", "m", "d"];

    #[test]
    fn broken_pattern_is_not_reported_as_bad_username() {
        let compiled = Regex::new("[bmd");
        let result = check_username(compiled.as_ref(), "[bmd", "b1234567");
        assert!(matches!(
            result,
            Err(AuthError::UsernamePattern { pattern: "[bmd", .. })
        ));
    }

    #[test]
    fn accepts_every_prefix_with_seven_digits() {
        for prefix in PREFIXES {
            let username = format!("{prefix}1234567");
            assert!(
                validate_username(&username).is_ok(),
                "{username} should be accepted"
            );
        }
        assert!(validate_username("b0000000").is_ok());
    }

    #[test]
    fn rejects_wrong_digit_counts() {
        for prefix in PREFIXES {
            for digits in ["", "123456", "12345678"] {
                let username = format!("{prefix}{digits}");
                assert!(
                    validate_username(&username).is_err(),
                    "{username} should be rejected"
                );
            }
        }
    }

    #[test]
    fn rejects_wrong_or_missing_prefix() {
        for username in ["testuser", "1234567", "a1234567", "B1234567", "bb1234567", ""] {
            assert!(
                validate_username(username).is_err(),
                "{username} should be rejected"
            );
        }
    }

    #[test]
    fn rejects_non_ascii_digits_and_padding() {
        for username in ["b12345٦7", "b123 567", " b1234567", "b1234567\n", "b12345a7"] {
            assert!(validate_username(username).is_err());
        }
    }

    #[test]
    fn error_reports_given_username() {
        match validate_username("testuser") {
            Err(AuthError::InvalidUsername { given }) => assert_eq!(given, "testuser"),
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
