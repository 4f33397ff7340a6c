//! Parsing of the `X-Akamai-G2O-Auth-Data` header.
//!
//! The data header is a comma-separated list of exactly six fields:
//!
//! ```text
//! version, edge-ip, client-ip, time, unique-id, nonce
//! ```
//!
//! `time` is in seconds since the Unix epoch. Every field is trimmed of
//! surrounding whitespace, but the raw header is kept verbatim because it is
//! part of the signed payload.
//!
//! Parsing is a two-stage process. [`AuthData::parse`] produces an immutable
//! record without a secret, and [`AuthData::with_secret`] attaches the secret
//! resolved for the record's nonce, producing the [`SignedAuthData`] consumed
//! by the [`signer`](crate::signer).

use std::fmt;

use tracing::debug;

use crate::error::{G2oError, G2oResult};

/// Number of comma-separated fields in a well-formed data header.
const FIELD_COUNT: usize = 6;

/// A parsed `X-Akamai-G2O-Auth-Data` header together with the sign-string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthData {
    raw: String,
    path: String,
    version: i32,
    edge_ip: String,
    client_ip: String,
    timestamp_millis: i64,
    unique_id: String,
    nonce: String,
}

impl AuthData {
    /// Parse a data header received for the request sign-string `path`.
    ///
    /// # Errors
    ///
    /// Returns [`G2oError::MalformedHeader`] if the header does not contain
    /// exactly six fields, if the version or time field is not an integer, or
    /// if the time does not fit in epoch milliseconds.
    ///
    /// # Examples
    ///
    /// ```
    /// use g2o_auth::AuthData;
    ///
    /// let data = AuthData::parse(
    ///     "/abc",
    ///     "5, 1.2.3.4, 3.4.5.6, 1471524574, 2805760.691583751, v1",
    /// )
    /// .unwrap();
    /// assert_eq!(data.version(), 5);
    /// assert_eq!(data.nonce(), "v1");
    /// assert_eq!(data.timestamp_millis(), 1_471_524_574_000);
    /// ```
    pub fn parse(path: &str, data_header: &str) -> G2oResult<Self> {
        let mut fields: Vec<&str> = data_header.split(',').collect();
        // Trailing empty segments are not fields; the edge may emit a final comma.
        while fields.last().is_some_and(|field| field.is_empty()) {
            fields.pop();
        }
        let fields: Vec<&str> = fields.into_iter().map(str::trim).collect();
        if fields.len() != FIELD_COUNT {
            debug!(fields = fields.len(), "G2O data header has wrong field count");
            return Err(G2oError::MalformedHeader);
        }

        let version = fields[0]
            .parse::<i32>()
            .map_err(|_| G2oError::MalformedHeader)?;
        let timestamp_millis = fields[3]
            .parse::<i64>()
            .ok()
            .and_then(|secs| secs.checked_mul(1000))
            .ok_or(G2oError::MalformedHeader)?;

        Ok(Self {
            raw: data_header.to_owned(),
            path: path.to_owned(),
            version,
            edge_ip: fields[1].to_owned(),
            client_ip: fields[2].to_owned(),
            timestamp_millis,
            unique_id: fields[4].to_owned(),
            nonce: fields[5].to_owned(),
        })
    }

    /// Render a data header in the layout the edge emits (`", "` separated).
    ///
    /// # Examples
    ///
    /// ```
    /// use g2o_auth::AuthData;
    ///
    /// let header = AuthData::format_header(3, "1.2.3.4", "3.4.5.6", 1_471_524_574, "42", "v1");
    /// assert_eq!(header, "3, 1.2.3.4, 3.4.5.6, 1471524574, 42, v1");
    /// ```
    #[must_use]
    pub fn format_header(
        version: i32,
        edge_ip: &str,
        client_ip: &str,
        time_secs: i64,
        unique_id: &str,
        nonce: &str,
    ) -> String {
        format!("{version}, {edge_ip}, {client_ip}, {time_secs}, {unique_id}, {nonce}")
    }

    /// Attach the secret resolved for this record's nonce.
    #[must_use]
    pub fn with_secret(self, secret: &str) -> SignedAuthData<'_> {
        SignedAuthData { data: self, secret }
    }

    /// The data header exactly as received.
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The request sign-string supplied by the caller.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The signing version. Not validated until signing.
    #[must_use]
    pub fn version(&self) -> i32 {
        self.version
    }

    /// IP address of the edge server that forwarded the request.
    #[must_use]
    pub fn edge_ip(&self) -> &str {
        &self.edge_ip
    }

    /// IP address of the original client.
    #[must_use]
    pub fn client_ip(&self) -> &str {
        &self.client_ip
    }

    /// Header time in epoch milliseconds.
    #[must_use]
    pub fn timestamp_millis(&self) -> i64 {
        self.timestamp_millis
    }

    /// Opaque per-request identifier assigned by the edge.
    #[must_use]
    pub fn unique_id(&self) -> &str {
        &self.unique_id
    }

    /// Key used to select the shared secret.
    #[must_use]
    pub fn nonce(&self) -> &str {
        &self.nonce
    }
}

/// An [`AuthData`] record with its shared secret attached, ready to sign.
#[derive(Clone, PartialEq, Eq)]
pub struct SignedAuthData<'s> {
    data: AuthData,
    secret: &'s str,
}

impl SignedAuthData<'_> {
    /// The parsed header record.
    #[must_use]
    pub fn data(&self) -> &AuthData {
        &self.data
    }

    /// The shared secret for the record's nonce.
    #[must_use]
    pub fn secret(&self) -> &str {
        self.secret
    }

    /// Drop the secret and return the parsed record.
    #[must_use]
    pub fn into_data(self) -> AuthData {
        self.data
    }
}

impl fmt::Debug for SignedAuthData<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignedAuthData")
            .field("data", &self.data)
            .field("secret", &"<redacted>")
            .finish()
    }
}
