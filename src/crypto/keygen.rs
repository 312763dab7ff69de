use crate::{
    algorithm::{Algorithm, Curve, KeyFamily},
    crypto::{
        format::{der_hex_to_pem, validate_pem},
        import::KeyMaterial,
        jwk::Jwk,
        jwt::{generate_jwt, verify_jwt, SignRequest, VerifyRequest},
        keys::PrivateKey,
    },
    error::{JwtError, Result},
};
use rand::rngs::OsRng;
use secrecy::Secret;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

pub const DEFAULT_RSA_KEY_SIZE: usize = 2048;
/// RSA moduli the signing backend accepts.
pub const RSA_KEY_SIZES: [usize; 3] = [2048, 3072, 4096];

/// Export format of a generated key pair
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyFormat {
    /// PKCS#8 private key and SPKI public key, PEM armoured
    #[default]
    #[serde(rename = "PEM")]
    Pem,
    /// Pretty-printed JSON Web Keys
    #[serde(rename = "JWK")]
    Jwk,
    /// PKCS#8 / SPKI DER bytes as lowercase hex
    #[serde(rename = "DER")]
    Der,
}

impl fmt::Display for KeyFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            KeyFormat::Pem => "PEM",
            KeyFormat::Jwk => "JWK",
            KeyFormat::Der => "DER",
        })
    }
}

impl FromStr for KeyFormat {
    type Err = JwtError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "PEM" => Ok(KeyFormat::Pem),
            "JWK" => Ok(KeyFormat::Jwk),
            "DER" => Ok(KeyFormat::Der),
            _ => Err(JwtError::Input(format!("unknown key format '{s}'"))),
        }
    }
}

/// A freshly generated key pair, both halves encoded in `format`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyPair {
    pub private_key: String,
    pub public_key: String,
    pub format: KeyFormat,
    pub algorithm: Algorithm,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_size: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub curve: Option<Curve>,
}

impl KeyPair {
    /// SHA-256 of the public key text, hex encoded
    ///
    /// Armour lines and whitespace are dropped first, so the same key gives
    /// the same fingerprint regardless of line wrapping.
    pub fn fingerprint(&self) -> String {
        let material: String = self
            .public_key
            .lines()
            .filter(|line| !line.trim_start().starts_with("-----"))
            .flat_map(str::chars)
            .filter(|c| !c.is_whitespace())
            .collect();
        hex::encode(Sha256::digest(material.as_bytes()))
    }
}

/// Typed input for [`generate_key_pair`]
#[derive(Debug)]
pub struct KeyPairOptions {
    pub algorithm: Algorithm,
    /// RSA modulus length in bits; ignored for other families
    pub key_size: Option<usize>,
    /// Must agree with the algorithm's curve when given
    pub curve: Option<Curve>,
    pub format: KeyFormat,
    /// Accepted for compatibility; keys are always exported unencrypted
    pub passphrase: Option<Secret<String>>,
}

impl KeyPairOptions {
    pub fn new(algorithm: Algorithm) -> Self {
        Self {
            algorithm,
            key_size: None,
            curve: None,
            format: KeyFormat::default(),
            passphrase: None,
        }
    }

    pub fn with_key_size(mut self, key_size: usize) -> Self {
        self.key_size = Some(key_size);
        self
    }

    pub fn with_curve(mut self, curve: Curve) -> Self {
        self.curve = Some(curve);
        self
    }

    pub fn with_format(mut self, format: KeyFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_passphrase(mut self, passphrase: impl Into<String>) -> Self {
        self.passphrase = Some(Secret::new(passphrase.into()));
        self
    }
}

/// String-typed key-pair request, as received from JSON
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyPairRequest {
    pub algorithm: String,
    #[serde(default)]
    pub key_size: Option<usize>,
    #[serde(default)]
    pub curve: Option<String>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub passphrase: Option<String>,
}

impl KeyPairRequest {
    pub fn to_options(&self) -> Result<KeyPairOptions> {
        let mut options = KeyPairOptions::new(self.algorithm.trim().parse()?);
        options.key_size = self.key_size;
        options.curve = self.curve.as_deref().map(str::parse::<Curve>).transpose()?;
        if let Some(format) = self.format.as_deref() {
            options.format = format.parse()?;
        }
        options.passphrase = self.passphrase.clone().map(Secret::new);
        Ok(options)
    }
}

/// Outcome of [`generate_key_pair_response`]
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyPairResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_pair: Option<KeyPair>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<Result<KeyPair>> for KeyPairResponse {
    fn from(result: Result<KeyPair>) -> Self {
        match result {
            Ok(key_pair) => Self {
                success: true,
                key_pair: Some(key_pair),
                error: None,
            },
            Err(e) => Self {
                success: false,
                key_pair: None,
                error: Some(e.to_string()),
            },
        }
    }
}

fn generate_private_key(alg: Algorithm, rsa_bits: usize) -> Result<PrivateKey> {
    let key = match (alg.family(), alg.curve()) {
        (KeyFamily::Rsa, _) => {
            if !RSA_KEY_SIZES.contains(&rsa_bits) {
                return Err(JwtError::Input(format!(
                    "RSA key size must be one of {RSA_KEY_SIZES:?}, got {rsa_bits}"
                )));
            }
            let key = rsa::RsaPrivateKey::new(&mut OsRng, rsa_bits)
                .map_err(|e| JwtError::KeyGeneration(e.to_string()))?;
            PrivateKey::Rsa(Box::new(key))
        }
        (_, Some(Curve::P256)) => PrivateKey::P256(p256::SecretKey::random(&mut OsRng)),
        (_, Some(Curve::P384)) => PrivateKey::P384(p384::SecretKey::random(&mut OsRng)),
        (_, Some(Curve::P521)) => PrivateKey::P521(p521::SecretKey::random(&mut OsRng)),
        (_, Some(Curve::Ed25519)) => {
            PrivateKey::Ed25519(ed25519_dalek::SigningKey::generate(&mut OsRng))
        }
        (KeyFamily::Hmac, _) | (_, None) => {
            return Err(JwtError::UnsupportedAlgorithm(alg.to_string()));
        }
    };
    Ok(key)
}

fn export_jwk(jwk: Jwk, alg: Algorithm) -> Result<String> {
    Jwk {
        alg: Some(alg.as_str().to_string()),
        key_use: Some("sig".to_string()),
        ..jwk
    }
    .to_json_pretty()
}

/// Generate a new asymmetric key pair
///
/// RSA algorithms use `key_size` (default 2048); ECDSA and EdDSA take their
/// curve from the algorithm. HMAC algorithms have no key pair and are
/// rejected with `UnsupportedAlgorithm`.
///
/// # Example
/// ```rust
/// use jwt_keytool::{generate_key_pair, Algorithm, KeyFormat, KeyPairOptions};
///
/// let pair = generate_key_pair(&KeyPairOptions::new(Algorithm::ES256).with_format(KeyFormat::Jwk)).unwrap();
/// assert!(pair.private_key.contains("\"d\""));
/// assert_eq!(pair.curve.unwrap().as_str(), "P-256");
/// ```
pub fn generate_key_pair(options: &KeyPairOptions) -> Result<KeyPair> {
    let alg = options.algorithm;
    if alg.is_symmetric() {
        return Err(JwtError::UnsupportedAlgorithm(alg.to_string()));
    }
    if let (Some(requested), Some(curve)) = (options.curve, alg.curve()) {
        if requested != curve {
            return Err(JwtError::Input(format!(
                "{alg} uses curve {curve}, not {requested}"
            )));
        }
    }
    if options.passphrase.is_some() {
        warn!("Passphrase ignored: generated keys are exported unencrypted");
    }

    let key_size = match alg.family() {
        KeyFamily::Rsa => Some(options.key_size.unwrap_or(DEFAULT_RSA_KEY_SIZE)),
        _ => None,
    };
    let private = generate_private_key(alg, key_size.unwrap_or(DEFAULT_RSA_KEY_SIZE))?;
    let public = private.public_key();

    let (private_key, public_key) = match options.format {
        KeyFormat::Pem => (private.to_pkcs8_pem()?, public.to_spki_pem()?),
        KeyFormat::Jwk => (
            export_jwk(private.to_jwk()?, alg)?,
            export_jwk(public.to_jwk(), alg)?,
        ),
        KeyFormat::Der => (
            hex::encode(private.to_pkcs8_der()?),
            hex::encode(public.to_spki_der()?),
        ),
    };
    debug!("Generated {} key pair for {} as {}", private.key_type(), alg, options.format);

    Ok(KeyPair {
        private_key,
        public_key,
        format: options.format,
        algorithm: alg,
        key_size,
        curve: alg.curve(),
    })
}

/// [`generate_key_pair`] for string-typed input; errors become `success: false`.
pub fn generate_key_pair_response(request: &KeyPairRequest) -> KeyPairResponse {
    let result = request
        .to_options()
        .and_then(|options| generate_key_pair(&options));
    if let Err(e) = &result {
        warn!("Key pair request for '{}' failed: {}", request.algorithm, e);
    }
    result.into()
}

/// Structural check of a key pair's encoding; nothing is parsed cryptographically
pub fn validate_key_pair_format(pair: &KeyPair) -> bool {
    match pair.format {
        KeyFormat::Pem => {
            pair.private_key.contains("PRIVATE KEY")
                && pair.public_key.contains("PUBLIC KEY")
                && validate_pem(&pair.private_key).is_ok()
                && validate_pem(&pair.public_key).is_ok()
        }
        KeyFormat::Jwk => {
            let kty = pair.algorithm.family().jwk_kty();
            match (Jwk::parse(&pair.private_key), Jwk::parse(&pair.public_key)) {
                (Ok(private), Ok(public)) => {
                    private.is_private()
                        && !public.is_private()
                        && private.kty == kty
                        && public.kty == kty
                }
                _ => false,
            }
        }
        KeyFormat::Der => [&pair.private_key, &pair.public_key]
            .iter()
            .all(|key| !key.is_empty() && hex::decode(key).is_ok()),
    }
}

/// Prove the two halves belong together by signing and verifying a probe token.
pub fn verify_key_pair(pair: &KeyPair) -> Result<()> {
    let (private_key, public_key) = match pair.format {
        KeyFormat::Der => (
            der_hex_to_pem(&pair.private_key, "PRIVATE KEY")?,
            der_hex_to_pem(&pair.public_key, "PUBLIC KEY")?,
        ),
        KeyFormat::Pem | KeyFormat::Jwk => (pair.private_key.clone(), pair.public_key.clone()),
    };
    let probe = serde_json::json!({ "sub": "key-pair-check", "iat": crate::crypto::claims::now() });
    let token = generate_jwt(&SignRequest::new(
        pair.algorithm,
        KeyMaterial::private_key(private_key),
        probe,
    ))?;
    verify_jwt(
        &VerifyRequest::new(token, KeyMaterial::public_key(public_key))
            .with_algorithms([pair.algorithm]),
    )?;
    debug!("Key pair for {} verified", pair.algorithm);
    Ok(())
}
