//! JSON codec for EIP-2335 keystore documents
//!
//! Parsing runs in two passes. serde first reads the document into wire
//! structs that keep every function tag as a plain string and the KDF
//! `params` as an untyped JSON value. The wire form is then converted into
//! the typed model, dispatching the KDF params on the `function` tag.
//!
//! Failures surface in this order: JSON syntax, document structure
//! (missing or unknown fields, wrong JSON types), function tags (kdf,
//! checksum, cipher), KDF params shape, hex decoding, version, and finally
//! parameter range validation.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::checksum::{Checksum, ChecksumFunction};
use super::cipher::{Cipher, CipherFunction, CipherParam};
use super::document::{Crypto, KeystoreDocument};
use super::error::{KeystoreError, KeystoreResult};
use super::kdf::{Kdf, KdfFunction, KdfParam, Pbkdf2Param, Prf, ScryptParam};

/// Parse and validate a keystore document
pub fn parse(json: &[u8]) -> KeystoreResult<KeystoreDocument> {
    let wire: WireKeystore<Value> = serde_json::from_slice(json)?;
    let document = KeystoreDocument::try_from(wire)?;
    document.validate()?;
    Ok(document)
}

/// Serialize a keystore document as pretty-printed JSON
pub fn serialize(document: &KeystoreDocument) -> KeystoreResult<String> {
    let wire = WireKeystore::from(document);
    Ok(serde_json::to_string_pretty(&wire)?)
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct WireKeystore<K> {
    crypto: WireCrypto<K>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    pubkey: String,
    path: String,
    uuid: String,
    version: u32,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct WireCrypto<K> {
    kdf: WireModule<K>,
    checksum: WireModule<EmptyParams>,
    cipher: WireModule<WireCipherParams>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct WireModule<P> {
    function: String,
    params: P,
    message: String,
}

/// Checksum params: always `{}`, unknown members are ignored
#[derive(Debug, Default, Serialize, Deserialize)]
struct EmptyParams {}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct WireCipherParams {
    iv: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct WirePbkdf2Params {
    dklen: u32,
    c: u32,
    prf: String,
    salt: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct WireScryptParams {
    dklen: u32,
    n: u32,
    p: u32,
    r: u32,
    salt: String,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum WireKdfParams {
    Pbkdf2(WirePbkdf2Params),
    Scrypt(WireScryptParams),
}

impl TryFrom<WireKeystore<Value>> for KeystoreDocument {
    type Error = KeystoreError;

    fn try_from(wire: WireKeystore<Value>) -> Result<Self, Self::Error> {
        let WireCrypto {
            kdf,
            checksum,
            cipher,
        } = wire.crypto;

        let kdf_function: KdfFunction = kdf.function.parse()?;
        let checksum_function: ChecksumFunction = checksum.function.parse()?;
        let cipher_function: CipherFunction = cipher.function.parse()?;

        let param = kdf_param_from_json(kdf_function, kdf.params)?;

        let crypto = Crypto {
            kdf: Kdf {
                param,
                message: kdf.message,
            },
            checksum: Checksum {
                function: checksum_function,
                message: decode_hex("checksum message", &checksum.message)?,
            },
            cipher: Cipher {
                function: cipher_function,
                params: CipherParam {
                    iv: decode_hex("cipher iv", &cipher.params.iv)?,
                },
                message: decode_hex("cipher message", &cipher.message)?,
            },
        };

        Ok(KeystoreDocument {
            crypto,
            description: wire.description,
            pubkey: decode_hex("pubkey", &wire.pubkey)?,
            path: wire.path,
            uuid: wire.uuid,
            version: wire.version,
        })
    }
}

fn kdf_param_from_json(function: KdfFunction, params: Value) -> KeystoreResult<KdfParam> {
    let shape_error =
        |e: serde_json::Error| KeystoreError::InvalidKdfParams(format!("{} params: {}", function, e));

    match function {
        KdfFunction::Pbkdf2 => {
            let wire: WirePbkdf2Params = serde_json::from_value(params).map_err(shape_error)?;
            let prf: Prf = wire.prf.parse()?;
            Ok(KdfParam::Pbkdf2(Pbkdf2Param {
                dklen: wire.dklen,
                c: wire.c,
                prf,
                salt: decode_hex("kdf salt", &wire.salt)?,
            }))
        }
        KdfFunction::Scrypt => {
            let wire: WireScryptParams = serde_json::from_value(params).map_err(shape_error)?;
            Ok(KdfParam::Scrypt(ScryptParam {
                dklen: wire.dklen,
                n: wire.n,
                p: wire.p,
                r: wire.r,
                salt: decode_hex("kdf salt", &wire.salt)?,
            }))
        }
    }
}

impl From<&KeystoreDocument> for WireKeystore<WireKdfParams> {
    fn from(document: &KeystoreDocument) -> Self {
        let crypto = &document.crypto;
        let params = match &crypto.kdf.param {
            KdfParam::Pbkdf2(p) => WireKdfParams::Pbkdf2(WirePbkdf2Params {
                dklen: p.dklen,
                c: p.c,
                prf: p.prf.as_str().to_string(),
                salt: hex::encode(&p.salt),
            }),
            KdfParam::Scrypt(p) => WireKdfParams::Scrypt(WireScryptParams {
                dklen: p.dklen,
                n: p.n,
                p: p.p,
                r: p.r,
                salt: hex::encode(&p.salt),
            }),
        };

        WireKeystore {
            crypto: WireCrypto {
                kdf: WireModule {
                    function: crypto.kdf.function().as_str().to_string(),
                    params,
                    message: crypto.kdf.message.clone(),
                },
                checksum: WireModule {
                    function: crypto.checksum.function.as_str().to_string(),
                    params: EmptyParams::default(),
                    message: hex::encode(&crypto.checksum.message),
                },
                cipher: WireModule {
                    function: crypto.cipher.function.as_str().to_string(),
                    params: WireCipherParams {
                        iv: hex::encode(&crypto.cipher.params.iv),
                    },
                    message: hex::encode(&crypto.cipher.message),
                },
            },
            description: document.description.clone(),
            pubkey: hex::encode(&document.pubkey),
            path: document.path.clone(),
            uuid: document.uuid.clone(),
            version: document.version,
        }
    }
}

/// Decode a hex field, tolerating a `0x` prefix
fn decode_hex(field: &str, value: &str) -> KeystoreResult<Vec<u8>> {
    let digits = value.strip_prefix("0x").unwrap_or(value);
    hex::decode(digits).map_err(|e| KeystoreError::HexError(format!("{}: {}", field, e)))
}
