use crate::algorithm::{Algorithm, KeyFamily};
use crate::error::{JwtError, Result};
use base64::prelude::*;
use serde::{Deserialize, Serialize};

/// JSON Web Key (RFC 7517) covering the RSA, EC and OKP key types
///
/// Private members (`d`, and `p`/`q`/`dp`/`dq`/`qi` for RSA) are only present
/// on private keys. Unknown members are ignored when parsing.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwk {
    pub kty: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crv: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub e: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub d: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub p: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub q: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dq: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qi: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,
    #[serde(rename = "use", skip_serializing_if = "Option::is_none")]
    pub key_use: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
}

impl Jwk {
    /// Parse a JWK document. A JWK set (`{"keys": [...]}`) or a bare array
    /// yields its first key.
    pub fn parse(json: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(json)
            .map_err(|e| JwtError::KeyImport(format!("JWK is not valid JSON: {e}")))?;
        let key = match value {
            serde_json::Value::Array(mut keys) if !keys.is_empty() => keys.swap_remove(0),
            serde_json::Value::Object(mut map) if map.contains_key("keys") => match map.remove("keys") {
                Some(serde_json::Value::Array(mut keys)) if !keys.is_empty() => keys.swap_remove(0),
                _ => return Err(JwtError::KeyImport("JWK set contains no keys".to_string())),
            },
            other => other,
        };
        serde_json::from_value(key)
            .map_err(|e| JwtError::KeyImport(format!("JWK is malformed: {e}")))
    }

    pub fn is_private(&self) -> bool {
        self.d.is_some()
    }

    /// Reject a key whose `kty` (or EC `crv`) does not fit `alg`.
    pub fn check_algorithm(&self, alg: Algorithm) -> Result<()> {
        let expected = alg.family().jwk_kty();
        if self.kty != expected {
            return Err(JwtError::AlgorithmMismatch(format!(
                "JWK key type '{}' cannot be used with {alg} (expected '{expected}')",
                self.kty
            )));
        }
        if let (Some(curve), Some(crv)) = (alg.curve(), self.crv.as_deref()) {
            if crv != curve.as_str() {
                return Err(JwtError::AlgorithmMismatch(format!(
                    "JWK curve '{crv}' cannot be used with {alg} (expected '{curve}')"
                )));
            }
        }
        if let Some(declared) = self.alg.as_deref() {
            if alg.family() != KeyFamily::Hmac && declared != alg.as_str() {
                return Err(JwtError::AlgorithmMismatch(format!(
                    "JWK is declared for {declared}, not {alg}"
                )));
            }
        }
        Ok(())
    }

    /// Decode a required base64url member.
    pub(crate) fn member(&self, name: &str) -> Result<Vec<u8>> {
        let value = match name {
            "x" => &self.x,
            "y" => &self.y,
            "n" => &self.n,
            "e" => &self.e,
            "d" => &self.d,
            "p" => &self.p,
            "q" => &self.q,
            _ => &None,
        };
        let value = value
            .as_deref()
            .ok_or_else(|| JwtError::KeyImport(format!("JWK is missing the '{name}' member")))?;
        b64url_decode(value)
            .map_err(|e| JwtError::KeyImport(format!("JWK member '{name}' is not base64url: {e}")))
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| JwtError::KeyGeneration(e.to_string()))
    }
}

pub(crate) fn b64url(bytes: impl AsRef<[u8]>) -> String {
    BASE64_URL_SAFE_NO_PAD.encode(bytes)
}

/// Decode base64url, tolerating padding and the standard alphabet.
pub(crate) fn b64url_decode(input: &str) -> std::result::Result<Vec<u8>, base64::DecodeError> {
    let normalized: String = input
        .trim()
        .trim_end_matches('=')
        .chars()
        .map(|c| match c {
            '+' => '-',
            '/' => '_',
            other => other,
        })
        .collect();
    BASE64_URL_SAFE_NO_PAD.decode(normalized)
}
