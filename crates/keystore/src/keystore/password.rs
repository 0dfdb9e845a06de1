//! Password normalization
//!
//! EIP-2335 passwords are turned into bytes by applying Unicode NFKD,
//! dropping the C0 (`0x00..=0x1F`), DEL (`0x7F`) and C1 (`0x80..=0x9F`)
//! control codes, and UTF-8 encoding what is left.

use unicode_normalization::UnicodeNormalization;

use crate::secure::{IntoSecret, SecretBytes};

/// Normalize a password into the byte string fed to the KDF.
pub fn normalize_password(password: &str) -> SecretBytes {
    let normalized: String = password.nfkd().filter(|c| !is_control_code(*c)).collect();
    normalized.into_bytes().into_secret()
}

fn is_control_code(c: char) -> bool {
    matches!(u32::from(c), 0x00..=0x1F | 0x7F..=0x9F)
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    fn normalized(password: &str) -> Vec<u8> {
        normalize_password(password).expose_secret().clone()
    }

    #[test]
    fn test_plain_ascii_unchanged() {
        assert_eq!(normalized("password"), b"password");
    }

    #[test]
    fn test_empty_password() {
        assert!(normalized("").is_empty());
    }

    #[test]
    fn test_control_codes_stripped() {
        assert_eq!(normalized("pass\nword\r\n"), b"password");
        assert_eq!(normalized("\u{0}pass\u{1F}word\u{7F}"), b"password");
        assert_eq!(normalized("pass\u{80}wo\u{9F}rd"), b"password");
    }

    #[test]
    fn test_characters_next_to_control_ranges_kept() {
        // space (0x20) and no-break space (0xA0, NFKD-maps to 0x20) survive
        assert_eq!(normalized(" a\u{A0}"), b" a ");
    }

    #[test]
    fn test_nfkd_compatibility_mapping() {
        // EIP-2335 test vector password
        let password = "\u{1D531}\u{1D522}\u{1D530}\u{1D531}\u{1D52D}\u{1D51E}\u{1D530}\u{1D530}\u{1D534}\u{1D52C}\u{1D52F}\u{1D521}\u{1F511}";
        assert_eq!(
            hex::encode(normalized(password)),
            "7465737470617373776f7264f09f9491"
        );
    }

    #[test]
    fn test_nfkd_decomposes_accents() {
        // U+00E9 decomposes into 'e' + U+0301
        assert_eq!(normalized("\u{E9}"), "e\u{301}".as_bytes());
    }
}
