//! G2O signature computation.
//!
//! The edge signs every forwarded request with one of five fixed algorithms,
//! selected by the version field of the data header:
//!
//! | Version | Algorithm   | Input                                          |
//! |---------|-------------|------------------------------------------------|
//! | 1       | MD5         | `secret + data + sign-string`                  |
//! | 2       | MD5 of MD5  | `MD5(secret + MD5(secret + data + sign-string))` |
//! | 3       | HMAC-MD5    | key `secret`, message `data + sign-string`     |
//! | 4       | HMAC-SHA1   | key `secret`, message `data + sign-string`     |
//! | 5       | HMAC-SHA256 | key `secret`, message `data + sign-string`     |
//!
//! The raw digest is encoded as standard, padded base64.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use hmac::{Hmac, KeyInit, Mac};
use md5::{Digest, Md5};
use sha1::Sha1;
use sha2::Sha256;

use crate::error::G2oError;
use crate::header::SignedAuthData;

type HmacMd5 = Hmac<Md5>;
type HmacSha1 = Hmac<Sha1>;
type HmacSha256 = Hmac<Sha256>;

/// The signing algorithms of the G2O protocol, keyed by header version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignatureVersion {
    /// Version 1: `MD5(secret, data, sign-string)`.
    Md5 = 1,
    /// Version 2: `MD5(secret, MD5(secret, data, sign-string))`.
    DoubleMd5 = 2,
    /// Version 3: `HMAC-MD5(secret; data, sign-string)`.
    HmacMd5 = 3,
    /// Version 4: `HMAC-SHA1(secret; data, sign-string)`.
    HmacSha1 = 4,
    /// Version 5: `HMAC-SHA256(secret; data, sign-string)`.
    HmacSha256 = 5,
}

impl SignatureVersion {
    /// The version number carried in the data header.
    #[must_use]
    pub fn number(self) -> i32 {
        self as i32
    }
}

impl TryFrom<i32> for SignatureVersion {
    type Error = G2oError;

    fn try_from(version: i32) -> Result<Self, Self::Error> {
        match version {
            1 => Ok(Self::Md5),
            2 => Ok(Self::DoubleMd5),
            3 => Ok(Self::HmacMd5),
            4 => Ok(Self::HmacSha1),
            5 => Ok(Self::HmacSha256),
            other => Err(G2oError::UnknownVersion(other)),
        }
    }
}

/// Compute the base64 signature the edge would send for `input`.
///
/// # Errors
///
/// Returns [`G2oError::UnknownVersion`] if the header version is not 1-5.
///
/// # Examples
///
/// ```
/// use g2o_auth::{AuthData, signer::sign};
///
/// let data = AuthData::parse(
///     "/abc",
///     "5, 1.2.3.4, 3.4.5.6, 1471524574, 2805760.691583751, v1",
/// )
/// .unwrap();
/// let signature = sign(&data.with_secret("s3cr3tk3y")).unwrap();
/// assert_eq!(signature, "d/8DhQppXfD8WvbEP5TU3UVrPxgifX4LumVfadVPxgk=");
/// ```
pub fn sign(input: &SignedAuthData<'_>) -> Result<String, G2oError> {
    let version = SignatureVersion::try_from(input.data().version())?;
    Ok(BASE64.encode(compute_digest(version, input)))
}

/// Compute the raw digest bytes for the given algorithm.
fn compute_digest(version: SignatureVersion, input: &SignedAuthData<'_>) -> Vec<u8> {
    let secret = input.secret().as_bytes();
    let raw = input.data().raw().as_bytes();
    let path = input.data().path().as_bytes();

    match version {
        SignatureVersion::Md5 => md5_chain(&[secret, raw, path]),
        SignatureVersion::DoubleMd5 => {
            let inner = md5_chain(&[secret, raw, path]);
            md5_chain(&[secret, inner.as_slice()])
        }
        SignatureVersion::HmacMd5 => {
            let mac = HmacMd5::new_from_slice(secret).expect("HMAC can accept keys of any length");
            finalize_mac(mac, &[raw, path])
        }
        SignatureVersion::HmacSha1 => {
            let mac =
                HmacSha1::new_from_slice(secret).expect("HMAC can accept keys of any length");
            finalize_mac(mac, &[raw, path])
        }
        SignatureVersion::HmacSha256 => {
            let mac =
                HmacSha256::new_from_slice(secret).expect("HMAC can accept keys of any length");
            finalize_mac(mac, &[raw, path])
        }
    }
}

/// MD5 over the concatenation of `parts`.
fn md5_chain(parts: &[&[u8]]) -> Vec<u8> {
    let mut hasher = Md5::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().to_vec()
}

/// Feed `parts` into a keyed MAC and return the tag bytes.
fn finalize_mac<M: Mac>(mut mac: M, parts: &[&[u8]]) -> Vec<u8> {
    for part in parts {
        mac.update(part);
    }
    mac.finalize().into_bytes().to_vec()
}
