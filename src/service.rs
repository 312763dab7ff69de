use crate::{
    algorithm::KeyFamily,
    config::JwtConfig,
    crypto::{
        claims::{now, out_of_range},
        jwt::{decode_jwt_with, generate_jwt, verify_jwt, DecodeOptions, SignRequest, TokenData, VerifyRequest},
        keygen::{generate_key_pair, KeyPair, KeyPairOptions, KeyPairRequest, KeyPairResponse},
    },
    error::{JwtError, Result},
};
use serde_json::Value;
use tracing::warn;
use uuid::Uuid;

/// JWT service that applies a [`JwtConfig`] to every operation
///
/// This service is a stateless façade over the free functions:
/// - Signing adds a default `exp` and a random `jti` when configured
/// - Decoding honours the nested-token opt-in
/// - Verification falls back to the configured leeway and algorithm allow-list
/// - Key-pair generation uses the configured RSA modulus size
///
/// Nothing is cached between calls; keys are imported afresh every time.
pub struct JwtService {
    pub jwt_config: JwtConfig,
}

impl JwtService {
    /// Create a new JWT service with the given configuration
    ///
    /// # Example
    /// ```rust
    /// use jwt_keytool::{JwtConfig, JwtService};
    ///
    /// let config = JwtConfig {
    ///     default_ttl: Some(3600), // 1 hour
    ///     issue_jti: true,
    ///     ..Default::default()
    /// };
    /// let service = JwtService::new(config);
    /// ```
    pub fn new(jwt_config: JwtConfig) -> Self {
        Self { jwt_config }
    }

    /// Sign a token
    ///
    /// Before signing, a payload without `exp` gets `now + default_ttl` (when
    /// a TTL is configured) and a payload without `jti` gets a UUID v4 (when
    /// `issue_jti` is on). Everything else behaves like [`generate_jwt`].
    ///
    /// # Example
    /// ```rust
    /// use jwt_keytool::{Algorithm, JwtConfig, JwtService, KeyMaterial, SignRequest, VerifyRequest};
    /// use serde_json::json;
    ///
    /// let service = JwtService::new(JwtConfig { default_ttl: Some(600), ..Default::default() });
    /// let token = service
    ///     .sign(SignRequest::new(Algorithm::HS512, KeyMaterial::secret("your-secret"), json!({ "sub": "alice" })))
    ///     .unwrap();
    ///
    /// let data = service.verify(VerifyRequest::new(token, KeyMaterial::secret("your-secret"))).unwrap();
    /// assert!(data.payload["exp"].is_i64());
    /// ```
    pub fn sign(&self, mut request: SignRequest) -> Result<String> {
        if let Value::Object(payload) = &mut request.payload {
            if let Some(ttl) = self.jwt_config.default_ttl {
                if !payload.contains_key("exp") {
                    let exp = now()
                        .checked_add(ttl)
                        .ok_or_else(|| JwtError::generation(out_of_range("exp")))?;
                    payload.insert("exp".to_string(), Value::from(exp));
                }
            }
            if self.jwt_config.issue_jti {
                payload
                    .entry("jti")
                    .or_insert_with(|| Value::from(Uuid::new_v4().to_string()));
            }
        }
        generate_jwt(&request)
    }

    /// Decode a token without verifying it, unwrapping nested tokens if configured.
    pub fn decode(&self, token: &str) -> Result<TokenData> {
        let options = DecodeOptions {
            unwrap_nested: self.jwt_config.unwrap_nested,
        };
        decode_jwt_with(token, &options)
    }

    /// Verify a token
    ///
    /// A request with no allow-list of its own uses `allowed_algorithms`, and
    /// one without a leeway uses the configured `leeway`. An explicit
    /// `with_leeway(0)` stays strict.
    ///
    /// # Returns
    /// * `Ok(TokenData)` - Signature and time claims are valid
    /// * `Err(JwtError::Verification)` - Token is forged, expired, or malformed
    pub fn verify(&self, mut request: VerifyRequest) -> Result<TokenData> {
        if request.algorithms.is_empty() {
            request.algorithms = self.jwt_config.allowed_algorithms.clone();
        }
        request.leeway.get_or_insert(self.jwt_config.leeway);
        verify_jwt(&request)
    }

    /// Generate a key pair, using `default_rsa_key_size` when an RSA request names no size.
    pub fn generate_key_pair(&self, mut options: KeyPairOptions) -> Result<KeyPair> {
        if options.algorithm.family() == KeyFamily::Rsa && options.key_size.is_none() {
            options.key_size = Some(self.jwt_config.default_rsa_key_size);
        }
        generate_key_pair(&options)
    }

    /// String-typed variant of [`JwtService::generate_key_pair`]; never fails.
    pub fn generate_key_pair_response(&self, request: &KeyPairRequest) -> KeyPairResponse {
        let result = request
            .to_options()
            .and_then(|options| self.generate_key_pair(options));
        if let Err(e) = &result {
            warn!("Key pair request for '{}' failed: {}", request.algorithm, e);
        }
        result.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithm::Algorithm;
    use crate::crypto::import::KeyMaterial;
    use serde_json::json;

    fn create_test_jwt_service() -> JwtService {
        let jwt_config = JwtConfig {
            leeway: 5,
            default_ttl: Some(3600),
            issue_jti: true,
            ..Default::default()
        };
        JwtService::new(jwt_config)
    }

    fn hs256(payload: Value) -> SignRequest {
        SignRequest::new(Algorithm::HS256, KeyMaterial::secret("test-secret-key"), payload)
    }

    #[test]
    fn test_sign_applies_ttl_and_jti() {
        let service = create_test_jwt_service();
        let token = service.sign(hs256(json!({ "sub": "user-1" }))).unwrap();
        let data = service.decode(&token).unwrap();

        let exp = data.payload["exp"].as_i64().unwrap();
        assert!((exp - now() - 3600).abs() <= 2);
        let jti = data.payload["jti"].as_str().unwrap();
        assert!(Uuid::parse_str(jti).is_ok());
    }

    #[test]
    fn test_sign_keeps_caller_exp_and_jti() {
        let service = create_test_jwt_service();
        let token = service
            .sign(hs256(json!({ "exp": 4102444800i64, "jti": "fixed" })))
            .unwrap();
        let data = service.decode(&token).unwrap();
        assert_eq!(data.payload["exp"], 4102444800i64);
        assert_eq!(data.payload["jti"], "fixed");
    }

    #[test]
    fn test_sign_rejects_non_object_payload() {
        let service = create_test_jwt_service();
        let err = service.sign(hs256(json!("just a string"))).unwrap_err();
        assert!(matches!(err, JwtError::Generation(_)));
    }

    #[test]
    fn test_verify_uses_configured_allow_list() {
        let service = JwtService::new(JwtConfig {
            allowed_algorithms: vec![Algorithm::HS512],
            ..Default::default()
        });
        let token = service.sign(hs256(json!({ "sub": "user" }))).unwrap();
        let err = service
            .verify(VerifyRequest::new(&token, KeyMaterial::secret("test-secret-key")))
            .unwrap_err();
        assert!(matches!(err.root_cause(), JwtError::AlgorithmMismatch(_)));

        // an explicit allow-list on the request takes precedence
        let data = service
            .verify(
                VerifyRequest::new(&token, KeyMaterial::secret("test-secret-key"))
                    .with_algorithms([Algorithm::HS256]),
            )
            .unwrap();
        assert_eq!(data.payload["sub"], "user");
    }

    #[test]
    fn test_verify_uses_configured_leeway() {
        let strict = JwtService::new(JwtConfig::default());
        let lenient = JwtService::new(JwtConfig {
            leeway: 120,
            ..Default::default()
        });
        let token = strict.sign(hs256(json!({ "exp": now() - 30 }))).unwrap();

        assert!(strict
            .verify(VerifyRequest::new(&token, KeyMaterial::secret("test-secret-key")))
            .is_err());
        assert!(lenient
            .verify(VerifyRequest::new(&token, KeyMaterial::secret("test-secret-key")))
            .is_ok());

        // an explicit zero leeway is not replaced by the configured one
        let err = lenient
            .verify(VerifyRequest::new(&token, KeyMaterial::secret("test-secret-key")).with_leeway(0))
            .unwrap_err();
        assert!(matches!(err.root_cause(), JwtError::Expired));
    }

    #[test]
    fn test_sign_with_huge_ttl_is_an_error() {
        let service = JwtService::new(JwtConfig {
            default_ttl: Some(i64::MAX - 1),
            ..Default::default()
        });
        let err = service.sign(hs256(json!({ "sub": "user" }))).unwrap_err();
        assert!(matches!(&err, JwtError::Generation(_)));
        assert!(matches!(err.root_cause(), JwtError::Input(msg) if msg.contains("'exp' is out of range")));

        // a caller-supplied exp means the TTL is never added
        assert!(service.sign(hs256(json!({ "exp": 4102444800i64 }))).is_ok());
    }

    #[test]
    fn test_decode_honours_unwrap_nested() {
        let nested = json!({
            "header": { "alg": "HS256", "typ": "JWT" },
            "payload": { "sub": "inner" },
            "signature": "sig",
        });
        let plain = JwtService::new(JwtConfig::default());
        let token = plain.sign(hs256(nested)).unwrap();
        assert!(plain.decode(&token).unwrap().payload.contains_key("header"));

        let unwrapping = JwtService::new(JwtConfig {
            unwrap_nested: true,
            ..Default::default()
        });
        let data = unwrapping.decode(&token).unwrap();
        assert_eq!(data.payload["sub"], "inner");
        assert_eq!(data.payload["_nestedJWT"], true);
    }

    #[test]
    fn test_generate_key_pair_response() {
        let service = create_test_jwt_service();
        let response = service.generate_key_pair_response(&KeyPairRequest {
            algorithm: "EdDSA".to_string(),
            format: Some("JWK".to_string()),
            ..Default::default()
        });
        assert!(response.success);
        assert!(response.error.is_none());

        let response = service.generate_key_pair_response(&KeyPairRequest {
            algorithm: "HS256".to_string(),
            ..Default::default()
        });
        assert!(!response.success);
        assert_eq!(response.error.as_deref(), Some("Unsupported algorithm: HS256"));
    }

    #[test]
    fn test_generate_key_pair_rejects_bad_configured_rsa_size() {
        let service = JwtService::new(JwtConfig {
            default_rsa_key_size: 512,
            ..Default::default()
        });
        let err = service
            .generate_key_pair(KeyPairOptions::new(Algorithm::RS256))
            .unwrap_err();
        assert!(matches!(err, JwtError::Input(_)));
    }
}
