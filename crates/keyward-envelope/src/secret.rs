// SPDX-FileCopyrightText: 2026 Keyward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Passphrase acquisition and secret masking for the CLI.

use keyward_core::KeywardError;
use secrecy::SecretString;

/// Environment variable consulted before prompting for the envelope passphrase.
pub const PASSPHRASE_ENV_VAR: &str = "KEYWARD_ENVELOPE_PASSPHRASE";

/// Get the envelope passphrase from [`PASSPHRASE_ENV_VAR`] or an interactive TTY prompt.
///
/// Returns an error if neither source yields a non-empty passphrase.
pub fn get_passphrase() -> Result<SecretString, KeywardError> {
    if let Ok(value) = std::env::var(PASSPHRASE_ENV_VAR)
        && !value.is_empty()
    {
        return Ok(SecretString::from(value));
    }

    if std::io::IsTerminal::is_terminal(&std::io::stdin()) {
        eprint!("Envelope passphrase: ");
        let passphrase = rpassword::read_password()
            .map_err(|e| KeywardError::Validation(format!("failed to read passphrase: {e}")))?;
        if passphrase.is_empty() {
            return Err(KeywardError::Validation("empty passphrase not allowed".to_string()));
        }
        return Ok(SecretString::from(passphrase));
    }

    Err(KeywardError::Validation(format!(
        "no passphrase provided; set {PASSPHRASE_ENV_VAR} or run interactively"
    )))
}

/// Mask a secret for display, keeping at most four characters at each end.
///
/// Values shorter than 10 characters are fully masked.
pub fn mask_secret(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() < 10 {
        return "****".to_string();
    }
    let prefix: String = chars[..4].iter().collect();
    let suffix: String = chars[chars.len() - 4..].iter().collect();
    format!("{prefix}...{suffix}")
}

#[cfg(test)]
mod tests {
    use secrecy::ExposeSecret;
    use serial_test::serial;

    use super::*;

    #[test]
    #[serial]
    fn passphrase_from_env_var() {
        // SAFETY: test-only env mutation, serialized with #[serial].
        unsafe { std::env::set_var(PASSPHRASE_ENV_VAR, "from-env") };
        let result = get_passphrase();
        unsafe { std::env::remove_var(PASSPHRASE_ENV_VAR) };

        assert_eq!(result.unwrap().expose_secret(), "from-env");
    }

    #[test]
    fn masks_long_and_short_values() {
        assert_eq!(mask_secret("hvs.CAESIabcdefgh1234"), "hvs....1234");
        assert_eq!(mask_secret("short"), "****");
        assert_eq!(mask_secret("ghp_ünïcødé_tøkén"), "ghp_...økén");
    }
}
