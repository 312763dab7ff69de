use crate::algorithm::Algorithm;
use crate::error::{JwtError, Result};
use serde::Deserialize;

/// Configuration for [`JwtService`](crate::service::JwtService)
///
/// Every field has a default, so a partial JSON document is enough:
///
/// # Example
/// ```rust
/// use jwt_keytool::JwtConfig;
///
/// let config = JwtConfig::from_json(r#"{ "leeway": 30, "default_ttl": 3600 }"#).unwrap();
/// assert_eq!(config.leeway, 30);
/// assert_eq!(config.default_rsa_key_size, 2048);
/// assert!(!config.unwrap_nested);
/// ```
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct JwtConfig {
    /// Clock skew tolerated when checking `exp` and `nbf`, in seconds
    pub leeway: u64,
    /// Lifetime added as `exp` when a signed payload carries none
    ///
    /// `None` leaves tokens without an expiry.
    pub default_ttl: Option<i64>,
    /// Add a random UUID v4 `jti` to payloads that carry none
    pub issue_jti: bool,
    /// Flatten payloads shaped like a previously decoded token
    ///
    /// Off by default: a payload that merely happens to contain `header`,
    /// `payload` and `signature` keys is returned untouched.
    pub unwrap_nested: bool,
    /// RSA modulus length used when a key-pair request names none
    pub default_rsa_key_size: usize,
    /// Algorithms accepted by verification when the request has no allow-list
    ///
    /// Empty means any supported algorithm that fits the key material.
    pub allowed_algorithms: Vec<Algorithm>,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            leeway: 0,
            default_ttl: None,
            issue_jti: false,
            unwrap_nested: false,
            default_rsa_key_size: crate::crypto::keygen::DEFAULT_RSA_KEY_SIZE,
            allowed_algorithms: Vec::new(),
        }
    }
}

impl JwtConfig {
    /// Parse a configuration from JSON
    ///
    /// # Arguments
    /// * `json` - A JSON object; missing fields take their defaults
    ///
    /// # Returns
    /// * `Ok(JwtConfig)` - The parsed configuration
    /// * `Err(JwtError::Config)` - Malformed JSON, a wrongly typed field or an unknown algorithm
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| JwtError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = JwtConfig::default();
        assert_eq!(config.leeway, 0);
        assert!(config.default_ttl.is_none());
        assert!(config.allowed_algorithms.is_empty());
    }

    #[test]
    fn test_from_json_with_algorithms() {
        let config =
            JwtConfig::from_json(r#"{ "allowed_algorithms": ["RS256", "EdDSA"], "issue_jti": true }"#)
                .unwrap();
        assert_eq!(config.allowed_algorithms, vec![Algorithm::RS256, Algorithm::EdDSA]);
        assert!(config.issue_jti);
    }

    #[test]
    fn test_from_json_rejects_unknown_algorithm() {
        let result = JwtConfig::from_json(r#"{ "allowed_algorithms": ["none"] }"#);
        assert!(matches!(result, Err(JwtError::Config(_))));
    }
}
