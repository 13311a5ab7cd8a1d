//! Local invite code derivation.
//!
//! Prefinery derives invite codes from a per-beta decode key and the tester's e-mail, which lets
//! an application check a code without a round trip to the server.
use sha1::{Digest, Sha1};

use crate::{Error, Result};

/// Compute the invite code for `email`: uppercase hex SHA-1 of `decode_key` followed by the
/// lowercased e-mail.
pub(crate) fn derive(decode_key: &str, email: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(decode_key.as_bytes());
    hasher.update(email.to_lowercase().as_bytes());
    hex::encode_upper(hasher.finalize())
}

/// Check `invite_code` against the code derived for `email`. The comparison is case-sensitive.
pub(crate) fn is_valid(decode_key: &str, email: &str, invite_code: &str) -> Result<bool> {
    if email.is_empty() {
        return Err(Error::InvalidArgument {
            name: "email",
            reason: "must not be empty",
        });
    }
    if invite_code.is_empty() {
        return Err(Error::InvalidArgument {
            name: "invite_code",
            reason: "must not be empty",
        });
    }

    Ok(derive(decode_key, email) == invite_code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_matches_known_digest() {
        // sha1("abc")
        assert_eq!(derive("a", "BC"), "A9993E364706816ABA3E25717850C26C9CD0D89D");
    }

    #[test]
    fn email_case_does_not_matter() {
        let code = derive("secret", "tester@example.com");
        assert!(is_valid("secret", "Tester@Example.COM", &code).unwrap());
    }

    #[test]
    fn code_comparison_is_case_sensitive() {
        let code = derive("secret", "tester@example.com").to_lowercase();
        assert!(!is_valid("secret", "tester@example.com", &code).unwrap());
    }

    #[test]
    fn wrong_key_is_rejected() {
        let code = derive("secret", "tester@example.com");
        assert!(!is_valid("other", "tester@example.com", &code).unwrap());
    }

    #[test]
    fn empty_arguments_are_rejected() {
        assert!(matches!(
            is_valid("secret", "", "CODE"),
            Err(Error::InvalidArgument { name: "email", .. })
        ));
        assert!(matches!(
            is_valid("secret", "tester@example.com", ""),
            Err(Error::InvalidArgument {
                name: "invite_code",
                ..
            })
        ));
    }
}
