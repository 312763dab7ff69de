//! Typed asymmetric key material and its PEM / DER / JWK encodings.
//!
//! Every asymmetric key that enters the crate, whether generated, read from
//! PEM or read from a JWK, becomes a [`PrivateKey`] or [`PublicKey`] first.
//! The key's type is therefore always known from its structure (PKCS#8/SPKI
//! algorithm OID, JWK `kty`/`crv`) before it is bound to an algorithm.

use crate::algorithm::{Algorithm, Curve, KeyFamily};
use crate::crypto::format::{encode_pem, parse_pem};
use crate::crypto::jwk::{b64url, Jwk};
use crate::error::{JwtError, Result};
use p256::elliptic_curve::sec1::ToEncodedPoint;
use pkcs8::spki::{AlgorithmIdentifierRef, SubjectPublicKeyInfoRef};
use pkcs8::{
    DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey, ObjectIdentifier,
    PrivateKeyInfo,
};
use rsa::pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey};
use rsa::traits::{PrivateKeyParts, PublicKeyParts};
use rsa::{BigUint, RsaPrivateKey, RsaPublicKey};
use std::fmt;

const OID_RSA_ENCRYPTION: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.1");
const OID_EC_PUBLIC_KEY: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.2.1");
const OID_SECP256R1: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.3.1.7");
const OID_SECP384R1: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.132.0.34");
const OID_SECP521R1: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.132.0.35");
const OID_ED25519: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.101.112");

/// Family and curve of a concrete key
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyType {
    pub family: KeyFamily,
    pub curve: Option<Curve>,
}

impl KeyType {
    const RSA: KeyType = KeyType {
        family: KeyFamily::Rsa,
        curve: None,
    };

    fn ec(curve: Curve) -> Self {
        KeyType {
            family: KeyFamily::Ecdsa,
            curve: Some(curve),
        }
    }

    const ED25519: KeyType = KeyType {
        family: KeyFamily::EdDsa,
        curve: Some(Curve::Ed25519),
    };

    /// Fail with `AlgorithmMismatch` unless a key of this type can serve `alg`.
    pub fn ensure_fits(&self, alg: Algorithm) -> Result<()> {
        if self.family == alg.family() && self.curve == alg.curve() {
            Ok(())
        } else {
            Err(JwtError::AlgorithmMismatch(format!(
                "{self} key cannot be used with {alg}"
            )))
        }
    }

    fn from_algorithm_identifier(algorithm: &AlgorithmIdentifierRef<'_>) -> Result<Self> {
        if algorithm.oid == OID_RSA_ENCRYPTION {
            Ok(KeyType::RSA)
        } else if algorithm.oid == OID_ED25519 {
            Ok(KeyType::ED25519)
        } else if algorithm.oid == OID_EC_PUBLIC_KEY {
            let curve_oid = algorithm
                .parameters_oid()
                .map_err(|e| JwtError::KeyImport(format!("EC key has no named curve: {e}")))?;
            let curve = match curve_oid {
                oid if oid == OID_SECP256R1 => Curve::P256,
                oid if oid == OID_SECP384R1 => Curve::P384,
                oid if oid == OID_SECP521R1 => Curve::P521,
                other => {
                    return Err(JwtError::KeyImport(format!("unsupported EC curve {other}")));
                }
            };
            Ok(KeyType::ec(curve))
        } else {
            Err(JwtError::KeyImport(format!(
                "unsupported key algorithm {}",
                algorithm.oid
            )))
        }
    }
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.family, self.curve) {
            (KeyFamily::Rsa, _) => f.write_str("RSA"),
            (KeyFamily::Ecdsa, Some(curve)) => write!(f, "EC {curve}"),
            (KeyFamily::EdDsa, _) => f.write_str("Ed25519"),
            (KeyFamily::Hmac, _) => f.write_str("symmetric"),
            (KeyFamily::Ecdsa, None) => f.write_str("EC"),
        }
    }
}

fn import_err(context: &str, e: impl fmt::Display) -> JwtError {
    JwtError::KeyImport(format!("{context}: {e}"))
}

fn export_err(e: impl fmt::Display) -> JwtError {
    JwtError::KeyGeneration(format!("key export failed: {e}"))
}

fn curve_from_jwk(jwk: &Jwk) -> Result<Curve> {
    let crv = jwk
        .crv
        .as_deref()
        .ok_or_else(|| JwtError::KeyImport("JWK is missing the 'crv' member".to_string()))?;
    crv.parse()
        .map_err(|_| JwtError::KeyImport(format!("unsupported JWK curve '{crv}'")))
}

fn fixed_32(bytes: Vec<u8>, what: &str) -> Result<[u8; 32]> {
    bytes
        .try_into()
        .map_err(|_| JwtError::KeyImport(format!("{what} must be 32 bytes")))
}

fn uncompressed_point(jwk: &Jwk) -> Result<Vec<u8>> {
    let mut point = vec![0x04];
    point.extend(jwk.member("x")?);
    point.extend(jwk.member("y")?);
    Ok(point)
}

/// An asymmetric private key
#[derive(Clone)]
pub enum PrivateKey {
    Rsa(Box<RsaPrivateKey>),
    P256(p256::SecretKey),
    P384(p384::SecretKey),
    P521(p521::SecretKey),
    Ed25519(ed25519_dalek::SigningKey),
}

/// An asymmetric public key
#[derive(Clone, Debug)]
pub enum PublicKey {
    Rsa(RsaPublicKey),
    P256(p256::PublicKey),
    P384(p384::PublicKey),
    P521(p521::PublicKey),
    Ed25519(ed25519_dalek::VerifyingKey),
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PrivateKey({})", self.key_type())
    }
}

impl PrivateKey {
    pub fn key_type(&self) -> KeyType {
        match self {
            PrivateKey::Rsa(_) => KeyType::RSA,
            PrivateKey::P256(_) => KeyType::ec(Curve::P256),
            PrivateKey::P384(_) => KeyType::ec(Curve::P384),
            PrivateKey::P521(_) => KeyType::ec(Curve::P521),
            PrivateKey::Ed25519(_) => KeyType::ED25519,
        }
    }

    pub fn public_key(&self) -> PublicKey {
        match self {
            PrivateKey::Rsa(key) => PublicKey::Rsa(key.to_public_key()),
            PrivateKey::P256(key) => PublicKey::P256(key.public_key()),
            PrivateKey::P384(key) => PublicKey::P384(key.public_key()),
            PrivateKey::P521(key) => PublicKey::P521(key.public_key()),
            PrivateKey::Ed25519(key) => PublicKey::Ed25519(key.verifying_key()),
        }
    }

    /// Parse PKCS#8 DER, picking the key type from the algorithm OID.
    pub fn from_pkcs8_der(der: &[u8]) -> Result<Self> {
        let info = PrivateKeyInfo::try_from(der)
            .map_err(|e| import_err("private key is not PKCS#8", e))?;
        let key_type = KeyType::from_algorithm_identifier(&info.algorithm)?;
        let ctx = "invalid PKCS#8 private key";
        let key = match (key_type.family, key_type.curve) {
            (KeyFamily::Rsa, _) => {
                PrivateKey::Rsa(Box::new(RsaPrivateKey::from_pkcs8_der(der).map_err(|e| import_err(ctx, e))?))
            }
            (KeyFamily::EdDsa, _) => PrivateKey::Ed25519(
                ed25519_dalek::SigningKey::from_pkcs8_der(der).map_err(|e| import_err(ctx, e))?,
            ),
            (_, Some(Curve::P256)) => {
                PrivateKey::P256(p256::SecretKey::from_pkcs8_der(der).map_err(|e| import_err(ctx, e))?)
            }
            (_, Some(Curve::P384)) => {
                PrivateKey::P384(p384::SecretKey::from_pkcs8_der(der).map_err(|e| import_err(ctx, e))?)
            }
            (_, Some(Curve::P521)) => {
                PrivateKey::P521(p521::SecretKey::from_pkcs8_der(der).map_err(|e| import_err(ctx, e))?)
            }
            _ => return Err(JwtError::KeyImport(format!("unsupported {key_type} private key"))),
        };
        Ok(key)
    }

    /// Parse a PEM private key
    ///
    /// Accepts PKCS#8 (`PRIVATE KEY`), PKCS#1 (`RSA PRIVATE KEY`) and SEC1
    /// (`EC PRIVATE KEY`) armour.
    pub fn from_pem(pem: &str) -> Result<Self> {
        let (label, der) = parse_pem(pem).map_err(|e| import_err("unreadable PEM", e))?;
        match label.as_str() {
            "PRIVATE KEY" => Self::from_pkcs8_der(&der),
            "RSA PRIVATE KEY" => RsaPrivateKey::from_pkcs1_der(&der)
                .map(|key| PrivateKey::Rsa(Box::new(key)))
                .map_err(|e| import_err("invalid PKCS#1 private key", e)),
            "EC PRIVATE KEY" => p256::SecretKey::from_sec1_der(&der)
                .map(PrivateKey::P256)
                .or_else(|_| p384::SecretKey::from_sec1_der(&der).map(PrivateKey::P384))
                .or_else(|_| p521::SecretKey::from_sec1_der(&der).map(PrivateKey::P521))
                .map_err(|e| import_err("invalid SEC1 private key", e)),
            "ENCRYPTED PRIVATE KEY" => Err(JwtError::KeyImport(
                "encrypted private keys are not supported".to_string(),
            )),
            other => Err(JwtError::KeyImport(format!(
                "expected a private key, found a '{other}' PEM block"
            ))),
        }
    }

    /// Build a private key from a JWK carrying the `d` member.
    pub fn from_jwk(jwk: &Jwk) -> Result<Self> {
        if !jwk.is_private() {
            return Err(JwtError::KeyImport(
                "expected a private JWK (missing 'd')".to_string(),
            ));
        }
        match jwk.kty.as_str() {
            "RSA" => {
                let uint = |name: &str| jwk.member(name).map(|b| BigUint::from_bytes_be(&b));
                let key = RsaPrivateKey::from_components(
                    uint("n")?,
                    uint("e")?,
                    uint("d")?,
                    vec![uint("p")?, uint("q")?],
                )
                .map_err(|e| import_err("invalid RSA JWK", e))?;
                Ok(PrivateKey::Rsa(Box::new(key)))
            }
            "EC" => {
                let d = jwk.member("d")?;
                let ctx = "invalid EC JWK";
                match curve_from_jwk(jwk)? {
                    Curve::P256 => p256::SecretKey::from_slice(&d)
                        .map(PrivateKey::P256)
                        .map_err(|e| import_err(ctx, e)),
                    Curve::P384 => p384::SecretKey::from_slice(&d)
                        .map(PrivateKey::P384)
                        .map_err(|e| import_err(ctx, e)),
                    Curve::P521 => p521::SecretKey::from_slice(&d)
                        .map(PrivateKey::P521)
                        .map_err(|e| import_err(ctx, e)),
                    Curve::Ed25519 => Err(JwtError::KeyImport(
                        "Ed25519 keys use kty 'OKP', not 'EC'".to_string(),
                    )),
                }
            }
            "OKP" => {
                if curve_from_jwk(jwk)? != Curve::Ed25519 {
                    return Err(JwtError::KeyImport("only Ed25519 OKP keys are supported".to_string()));
                }
                let d = fixed_32(jwk.member("d")?, "Ed25519 private key")?;
                Ok(PrivateKey::Ed25519(ed25519_dalek::SigningKey::from_bytes(&d)))
            }
            other => Err(JwtError::KeyImport(format!("unsupported JWK key type '{other}'"))),
        }
    }

    pub fn to_pkcs8_der(&self) -> Result<Vec<u8>> {
        let doc = match self {
            PrivateKey::Rsa(key) => key.to_pkcs8_der(),
            PrivateKey::P256(key) => key.to_pkcs8_der(),
            PrivateKey::P384(key) => key.to_pkcs8_der(),
            PrivateKey::P521(key) => key.to_pkcs8_der(),
            PrivateKey::Ed25519(key) => key.to_pkcs8_der(),
        }
        .map_err(export_err)?;
        Ok(doc.as_bytes().to_vec())
    }

    pub fn to_pkcs8_pem(&self) -> Result<String> {
        Ok(encode_pem("PRIVATE KEY", &self.to_pkcs8_der()?))
    }

    /// Private JWK, public members included.
    pub fn to_jwk(&self) -> Result<Jwk> {
        let mut jwk = self.public_key().to_jwk();
        match self {
            PrivateKey::Rsa(key) => {
                let primes = key.primes();
                if primes.len() != 2 {
                    return Err(export_err("multi-prime RSA keys cannot be exported as JWK"));
                }
                jwk.d = Some(b64url(key.d().to_bytes_be()));
                jwk.p = Some(b64url(primes[0].to_bytes_be()));
                jwk.q = Some(b64url(primes[1].to_bytes_be()));
                jwk.dp = key.dp().map(|v| b64url(v.to_bytes_be()));
                jwk.dq = key.dq().map(|v| b64url(v.to_bytes_be()));
                jwk.qi = key.crt_coefficient().map(|v| b64url(v.to_bytes_be()));
            }
            PrivateKey::P256(key) => jwk.d = Some(b64url(key.to_bytes())),
            PrivateKey::P384(key) => jwk.d = Some(b64url(key.to_bytes())),
            PrivateKey::P521(key) => jwk.d = Some(b64url(key.to_bytes())),
            PrivateKey::Ed25519(key) => jwk.d = Some(b64url(key.to_bytes())),
        }
        Ok(jwk)
    }
}

impl PublicKey {
    pub fn key_type(&self) -> KeyType {
        match self {
            PublicKey::Rsa(_) => KeyType::RSA,
            PublicKey::P256(_) => KeyType::ec(Curve::P256),
            PublicKey::P384(_) => KeyType::ec(Curve::P384),
            PublicKey::P521(_) => KeyType::ec(Curve::P521),
            PublicKey::Ed25519(_) => KeyType::ED25519,
        }
    }

    /// Parse SPKI DER, picking the key type from the algorithm OID.
    pub fn from_spki_der(der: &[u8]) -> Result<Self> {
        let info = SubjectPublicKeyInfoRef::try_from(der)
            .map_err(|e| import_err("public key is not SPKI", e))?;
        let key_type = KeyType::from_algorithm_identifier(&info.algorithm)?;
        let ctx = "invalid SPKI public key";
        let key = match (key_type.family, key_type.curve) {
            (KeyFamily::Rsa, _) => {
                PublicKey::Rsa(RsaPublicKey::from_public_key_der(der).map_err(|e| import_err(ctx, e))?)
            }
            (KeyFamily::EdDsa, _) => PublicKey::Ed25519(
                ed25519_dalek::VerifyingKey::from_public_key_der(der).map_err(|e| import_err(ctx, e))?,
            ),
            (_, Some(Curve::P256)) => {
                PublicKey::P256(p256::PublicKey::from_public_key_der(der).map_err(|e| import_err(ctx, e))?)
            }
            (_, Some(Curve::P384)) => {
                PublicKey::P384(p384::PublicKey::from_public_key_der(der).map_err(|e| import_err(ctx, e))?)
            }
            (_, Some(Curve::P521)) => {
                PublicKey::P521(p521::PublicKey::from_public_key_der(der).map_err(|e| import_err(ctx, e))?)
            }
            _ => return Err(JwtError::KeyImport(format!("unsupported {key_type} public key"))),
        };
        Ok(key)
    }

    /// Parse a PEM public key (`PUBLIC KEY` or PKCS#1 `RSA PUBLIC KEY`).
    pub fn from_pem(pem: &str) -> Result<Self> {
        let (label, der) = parse_pem(pem).map_err(|e| import_err("unreadable PEM", e))?;
        match label.as_str() {
            "PUBLIC KEY" => Self::from_spki_der(&der),
            "RSA PUBLIC KEY" => RsaPublicKey::from_pkcs1_der(&der)
                .map(PublicKey::Rsa)
                .map_err(|e| import_err("invalid PKCS#1 public key", e)),
            other => Err(JwtError::KeyImport(format!(
                "expected a public key, found a '{other}' PEM block"
            ))),
        }
    }

    /// Build a public key from a JWK; private members are ignored.
    pub fn from_jwk(jwk: &Jwk) -> Result<Self> {
        match jwk.kty.as_str() {
            "RSA" => {
                let n = BigUint::from_bytes_be(&jwk.member("n")?);
                let e = BigUint::from_bytes_be(&jwk.member("e")?);
                RsaPublicKey::new(n, e)
                    .map(PublicKey::Rsa)
                    .map_err(|e| import_err("invalid RSA JWK", e))
            }
            "EC" => {
                let point = uncompressed_point(jwk)?;
                let ctx = "invalid EC JWK";
                match curve_from_jwk(jwk)? {
                    Curve::P256 => p256::PublicKey::from_sec1_bytes(&point)
                        .map(PublicKey::P256)
                        .map_err(|e| import_err(ctx, e)),
                    Curve::P384 => p384::PublicKey::from_sec1_bytes(&point)
                        .map(PublicKey::P384)
                        .map_err(|e| import_err(ctx, e)),
                    Curve::P521 => p521::PublicKey::from_sec1_bytes(&point)
                        .map(PublicKey::P521)
                        .map_err(|e| import_err(ctx, e)),
                    Curve::Ed25519 => Err(JwtError::KeyImport(
                        "Ed25519 keys use kty 'OKP', not 'EC'".to_string(),
                    )),
                }
            }
            "OKP" => {
                if curve_from_jwk(jwk)? != Curve::Ed25519 {
                    return Err(JwtError::KeyImport("only Ed25519 OKP keys are supported".to_string()));
                }
                let x = fixed_32(jwk.member("x")?, "Ed25519 public key")?;
                ed25519_dalek::VerifyingKey::from_bytes(&x)
                    .map(PublicKey::Ed25519)
                    .map_err(|e| import_err("invalid OKP JWK", e))
            }
            other => Err(JwtError::KeyImport(format!("unsupported JWK key type '{other}'"))),
        }
    }

    pub fn to_spki_der(&self) -> Result<Vec<u8>> {
        let doc = match self {
            PublicKey::Rsa(key) => key.to_public_key_der(),
            PublicKey::P256(key) => key.to_public_key_der(),
            PublicKey::P384(key) => key.to_public_key_der(),
            PublicKey::P521(key) => key.to_public_key_der(),
            PublicKey::Ed25519(key) => key.to_public_key_der(),
        }
        .map_err(export_err)?;
        Ok(doc.as_bytes().to_vec())
    }

    pub fn to_spki_pem(&self) -> Result<String> {
        Ok(encode_pem("PUBLIC KEY", &self.to_spki_der()?))
    }

    /// Uncompressed SEC1 point for EC keys.
    pub(crate) fn sec1_point(&self) -> Option<Vec<u8>> {
        match self {
            PublicKey::P256(key) => Some(key.to_encoded_point(false).as_bytes().to_vec()),
            PublicKey::P384(key) => Some(key.to_encoded_point(false).as_bytes().to_vec()),
            PublicKey::P521(key) => Some(key.to_encoded_point(false).as_bytes().to_vec()),
            PublicKey::Rsa(_) | PublicKey::Ed25519(_) => None,
        }
    }

    pub fn to_jwk(&self) -> Jwk {
        let key_type = self.key_type();
        let mut jwk = Jwk {
            kty: key_type.family.jwk_kty().to_string(),
            crv: key_type.curve.map(|c| c.as_str().to_string()),
            ..Default::default()
        };
        match self {
            PublicKey::Rsa(key) => {
                jwk.n = Some(b64url(key.n().to_bytes_be()));
                jwk.e = Some(b64url(key.e().to_bytes_be()));
            }
            PublicKey::Ed25519(key) => jwk.x = Some(b64url(key.as_bytes())),
            PublicKey::P256(_) | PublicKey::P384(_) | PublicKey::P521(_) => {
                if let Some(point) = self.sec1_point() {
                    // 0x04 || x || y, coordinates of equal length
                    let coords = &point[1..];
                    let (x, y) = coords.split_at(coords.len() / 2);
                    jwk.x = Some(b64url(x));
                    jwk.y = Some(b64url(y));
                }
            }
        }
        jwk
    }
}
