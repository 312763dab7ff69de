//! # jwt-keytool
//!
//! A Rust library for **signing, decoding and verifying JSON Web Tokens** and for
//! **generating and importing the asymmetric keys** they are signed with.
//! Keys can be supplied as raw secrets, PEM (PKCS#8, SPKI, PKCS#1, SEC1) or JWK.
//!
//! ## Features
//!
//! - **Ten JWS Algorithms** - HS256/384/512, RS256/384/512, ES256/384/512 and EdDSA
//! - **Key Format Detection** - PEM, JWK and bare base64 key bodies are told apart automatically
//! - **Key Consistency Checks** - A key from the wrong family or curve is rejected before signing
//! - **Key-Pair Generation** - RSA, P-256/384/521 and Ed25519 pairs exported as PEM, JWK or DER
//! - **Stateless Design** - Every call is independent, keys are never cached
//! - **Comprehensive Error Handling** - One error type with the underlying cause kept intact
//!
//! ## Quick Start
//!
//! ```rust
//! use jwt_keytool::{decode_jwt, generate_jwt, verify_jwt, Algorithm, KeyMaterial, SignRequest, VerifyRequest};
//! use serde_json::json;
//!
//! // Sign a token with a shared secret
//! let request = SignRequest::new(
//!     Algorithm::HS256,
//!     KeyMaterial::secret("test-secret"),
//!     json!({ "sub": "1234567890", "name": "John Doe", "iat": 1516239022 }),
//! );
//! let token = generate_jwt(&request).unwrap();
//!
//! // Decode without checking the signature
//! let decoded = decode_jwt(&token).unwrap();
//! assert_eq!(decoded.header["alg"], "HS256");
//!
//! // Verify the signature and time claims
//! match verify_jwt(&VerifyRequest::new(token, KeyMaterial::secret("test-secret"))) {
//!     Ok(data) => println!("Token for {}", data.payload["name"]),
//!     Err(e) => println!("Verification failed: {}", e),
//! }
//! ```
//!
//! ## Examples
//!
//! See the [basic_workflow demo](demos/basic_workflow.rs) for key generation,
//! signing and verification with every key format:
//!
//! ```bash
//! cargo run --example basic_workflow
//! ```

pub mod algorithm;
pub mod config;
pub mod crypto;
pub mod error;
pub mod service;

// Re-export main types for easier access
pub use algorithm::{
    algorithm_info, supported_algorithms, Algorithm, AlgorithmInfo, Curve, KeyFamily,
    SecurityLevel, SupportedAlgorithms,
};
pub use config::JwtConfig;
pub use crypto::claims::{format_timestamp, is_token_expired, parse_time_span};
pub use crypto::format::{detect_format, validate_jwk, validate_pem, DetectedFormat};
pub use crypto::import::KeyMaterial;
pub use crypto::jwk::Jwk;
pub use crypto::jwt::{
    decode_jwt, decode_jwt_with, generate_jwt, verify_jwt, DecodeOptions, SignRequest, TokenData,
    VerifyRequest,
};
pub use crypto::keygen::{
    generate_key_pair, generate_key_pair_response, validate_key_pair_format, verify_key_pair,
    KeyFormat, KeyPair, KeyPairOptions, KeyPairRequest, KeyPairResponse,
};
pub use error::{JwtError, Result};
pub use service::JwtService;
