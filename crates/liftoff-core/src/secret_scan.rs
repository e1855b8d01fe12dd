//! Detection of credential-looking strings in plain configuration.

use regex::Regex;
use std::sync::LazyLock;

static SUSPECT_SECRET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"\bsk-[A-Za-z0-9]{20,}\b",
        r"|\bya29\.[A-Za-z0-9\-_]+\b",
        r"|\bAIza[0-9A-Za-z\-_]{20,}\b",
        r"|\bghp_[A-Za-z0-9]{20,}\b",
        r"|-----BEGIN (?:RSA |EC )?PRIVATE KEY-----",
    ))
    .expect("static regex is valid")
});

/// Whether `value` contains something shaped like an API key, access
/// token, or private key.
///
/// ```
/// use liftoff_core::looks_like_secret;
///
/// assert!(looks_like_secret("AIzaSyA1234567890abcdefghijklmn"));
/// assert!(!looks_like_secret("us-central1"));
/// ```
pub fn looks_like_secret(value: &str) -> bool {
    SUSPECT_SECRET.is_match(value)
}

/// Fail with [`Error::SuspectedSecret`](crate::Error::SuspectedSecret) when
/// `value` looks like a credential.
pub fn ensure_not_secret(value: &str, field: &str) -> crate::Result<()> {
    if looks_like_secret(value) {
        return Err(crate::Error::SuspectedSecret {
            field: field.to_owned(),
        });
    }
    Ok(())
}
