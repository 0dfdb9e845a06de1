//! Property-based tests for keystore encryption
//!
//! Uses proptest to check round trips across arbitrary secrets and passwords.

use proptest::prelude::*;
use v4convert_keystore::keystore::{generate_iv, KdfParam, KeystoreDocument};
use v4convert_keystore::{normalize_password, ExposeSecret, KeystoreError, OsRandom};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Property: decrypt(encrypt(secret)) == secret
    #[test]
    fn prop_encrypt_decrypt_roundtrip(
        secret in prop::collection::vec(any::<u8>(), 0..96),
        password in "\\PC{0,24}",
    ) {
        let keystore = KeystoreDocument::encrypt(
            &secret,
            &password,
            &[0xAA; 48],
            "",
            KdfParam::pbkdf2(1, &OsRandom),
            generate_iv(&OsRandom),
        ).unwrap();

        let decrypted = keystore.decrypt(&password).unwrap();
        prop_assert_eq!(decrypted.expose_secret(), &secret);
    }

    /// Property: the JSON form parses back to the same document
    #[test]
    fn prop_json_roundtrip(secret in prop::collection::vec(any::<u8>(), 1..64)) {
        let keystore = KeystoreDocument::encrypt(
            &secret,
            "pw",
            &secret,
            "m/12381/3600/0/0/0",
            KdfParam::scrypt(2, 1, 1, &OsRandom),
            generate_iv(&OsRandom),
        ).unwrap();

        let parsed = KeystoreDocument::from_json(keystore.to_json().unwrap().as_bytes()).unwrap();
        prop_assert_eq!(parsed, keystore);
    }

    /// Property: a password differing after normalization fails the checksum
    #[test]
    fn prop_other_password_rejected(password in "[a-z]{1,16}", other in "[A-Z0-9]{1,16}") {
        let keystore = KeystoreDocument::encrypt(
            &[0x01; 32],
            &password,
            &[],
            "",
            KdfParam::pbkdf2(1, &OsRandom),
            generate_iv(&OsRandom),
        ).unwrap();

        let result = keystore.decrypt(&other);
        prop_assert!(matches!(result, Err(KeystoreError::ChecksumMismatch)));
    }

    /// Property: normalization is idempotent
    #[test]
    fn prop_normalization_idempotent(password in "\\PC{0,32}") {
        let once = normalize_password(&password);
        let text = String::from_utf8(once.expose_secret().clone()).unwrap();
        let twice = normalize_password(&text);
        prop_assert_eq!(once.expose_secret(), twice.expose_secret());
    }
}
