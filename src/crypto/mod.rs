pub mod claims;
pub mod format;
pub mod import;
pub mod jwk;
pub mod jwt;
pub mod keygen;
pub mod keys;

// Re-export main functions for easier access
pub use claims::{format_timestamp, is_token_expired, parse_time_span};
pub use format::{detect_format, validate_jwk, validate_pem, DetectedFormat};
pub use import::KeyMaterial;
pub use jwt::{decode_jwt, decode_jwt_with, generate_jwt, verify_jwt};
pub use keygen::{
    generate_key_pair, generate_key_pair_response, validate_key_pair_format, verify_key_pair,
};
