use thiserror::Error;

/// Errors produced by key handling and JWT operations
///
/// Signing failures are reported as [`JwtError::Generation`] and verification
/// failures as [`JwtError::Verification`]; both wrap the underlying cause,
/// which stays reachable through [`std::error::Error::source`].
///
/// # Example
/// ```rust
/// use jwt_keytool::{decode_jwt, JwtError};
///
/// match decode_jwt("not-a-token") {
///     Err(JwtError::Format(msg)) => println!("Malformed token: {}", msg),
///     Err(e) => println!("Other error: {}", e),
///     Ok(_) => unreachable!(),
/// }
/// ```
#[derive(Debug, Error)]
pub enum JwtError {
    /// A required input is missing or has the wrong shape
    ///
    /// This error occurs when:
    /// - The payload is not a JSON object
    /// - No secret is given for an HMAC algorithm
    /// - No private key is given for an asymmetric algorithm
    /// - A registered claim has the wrong JSON type
    #[error("Invalid input: {0}")]
    Input(String),

    /// A PEM block, JWK document or compact token is structurally malformed
    #[error("Invalid format: {0}")]
    Format(String),

    /// Key material could not be turned into a usable key
    ///
    /// This error occurs when:
    /// - The PEM body is not valid base64 or not a PKCS#8/SPKI/PKCS#1 structure
    /// - The JWK document is missing members required for its key type
    /// - A public key was supplied where a private key is needed (or the reverse)
    #[error("Key import failed: {0}")]
    KeyImport(String),

    /// The key type does not belong to the requested algorithm's family
    #[error("Algorithm mismatch: {0}")]
    AlgorithmMismatch(String),

    /// The algorithm name is unknown or not valid for the operation
    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// Key-pair generation or export failed
    #[error("Key generation failed: {0}")]
    KeyGeneration(String),

    /// The token signature does not match its content
    #[error("Invalid signature")]
    InvalidSignature,

    /// The token's `exp` claim is in the past
    #[error("Token has expired")]
    Expired,

    /// The token's `nbf` claim is in the future
    #[error("Token is not yet valid")]
    NotYetValid,

    /// A claim failed an issuer/audience/type check
    #[error("Invalid claim: {0}")]
    Claim(String),

    /// The underlying signature engine reported an error
    #[error("Cryptographic error: {0}")]
    Crypto(String),

    /// Configuration could not be parsed
    #[error("Configuration error: {0}")]
    Config(String),

    /// Building a signed token failed
    #[error("JWT generation failed: {0}")]
    Generation(#[source] Box<JwtError>),

    /// Verifying a token failed
    #[error("JWT verification failed: {0}")]
    Verification(#[source] Box<JwtError>),
}

impl JwtError {
    /// Wrap `cause` as a token generation failure
    ///
    /// # Example
    /// ```rust
    /// use jwt_keytool::JwtError;
    ///
    /// let err = JwtError::generation(JwtError::Input("payload is required".to_string()));
    /// assert_eq!(err.to_string(), "JWT generation failed: Invalid input: payload is required");
    /// ```
    pub fn generation(cause: JwtError) -> Self {
        JwtError::Generation(Box::new(cause))
    }

    /// Wrap `cause` as a token verification failure
    ///
    /// # Example
    /// ```rust
    /// use jwt_keytool::JwtError;
    ///
    /// let err = JwtError::verification(JwtError::Expired);
    /// assert!(matches!(err.root_cause(), JwtError::Expired));
    /// ```
    pub fn verification(cause: JwtError) -> Self {
        JwtError::Verification(Box::new(cause))
    }

    /// The innermost error, looking through the generation/verification wrappers.
    pub fn root_cause(&self) -> &JwtError {
        match self {
            JwtError::Generation(inner) | JwtError::Verification(inner) => inner.root_cause(),
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, JwtError>;
