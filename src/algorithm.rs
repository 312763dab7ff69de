use crate::error::JwtError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// JWS signing algorithms supported by this crate
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Algorithm {
    HS256,
    HS384,
    HS512,
    RS256,
    RS384,
    RS512,
    ES256,
    ES384,
    ES512,
    EdDSA,
}

/// Key family an algorithm belongs to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum KeyFamily {
    Hmac,
    Rsa,
    Ecdsa,
    EdDsa,
}

/// Named curves used by the EC and EdDSA families
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Curve {
    #[serde(rename = "P-256")]
    P256,
    #[serde(rename = "P-384")]
    P384,
    #[serde(rename = "P-521")]
    P521,
    Ed25519,
}

impl Algorithm {
    pub const ALL: [Algorithm; 10] = [
        Algorithm::HS256,
        Algorithm::HS384,
        Algorithm::HS512,
        Algorithm::RS256,
        Algorithm::RS384,
        Algorithm::RS512,
        Algorithm::ES256,
        Algorithm::ES384,
        Algorithm::ES512,
        Algorithm::EdDSA,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Algorithm::HS256 => "HS256",
            Algorithm::HS384 => "HS384",
            Algorithm::HS512 => "HS512",
            Algorithm::RS256 => "RS256",
            Algorithm::RS384 => "RS384",
            Algorithm::RS512 => "RS512",
            Algorithm::ES256 => "ES256",
            Algorithm::ES384 => "ES384",
            Algorithm::ES512 => "ES512",
            Algorithm::EdDSA => "EdDSA",
        }
    }

    pub fn family(&self) -> KeyFamily {
        match self {
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => KeyFamily::Hmac,
            Algorithm::RS256 | Algorithm::RS384 | Algorithm::RS512 => KeyFamily::Rsa,
            Algorithm::ES256 | Algorithm::ES384 | Algorithm::ES512 => KeyFamily::Ecdsa,
            Algorithm::EdDSA => KeyFamily::EdDsa,
        }
    }

    /// The curve an algorithm is bound to, `None` for HMAC and RSA.
    pub fn curve(&self) -> Option<Curve> {
        match self {
            Algorithm::ES256 => Some(Curve::P256),
            Algorithm::ES384 => Some(Curve::P384),
            Algorithm::ES512 => Some(Curve::P521),
            Algorithm::EdDSA => Some(Curve::Ed25519),
            _ => None,
        }
    }

    pub fn is_symmetric(&self) -> bool {
        self.family() == KeyFamily::Hmac
    }

    /// The matching `jsonwebtoken` algorithm. ES512 has no counterpart there
    /// and is signed with `p521` directly.
    pub(crate) fn to_jose(self) -> Option<jsonwebtoken::Algorithm> {
        use jsonwebtoken::Algorithm as Jose;
        match self {
            Algorithm::HS256 => Some(Jose::HS256),
            Algorithm::HS384 => Some(Jose::HS384),
            Algorithm::HS512 => Some(Jose::HS512),
            Algorithm::RS256 => Some(Jose::RS256),
            Algorithm::RS384 => Some(Jose::RS384),
            Algorithm::RS512 => Some(Jose::RS512),
            Algorithm::ES256 => Some(Jose::ES256),
            Algorithm::ES384 => Some(Jose::ES384),
            Algorithm::ES512 => None,
            Algorithm::EdDSA => Some(Jose::EdDSA),
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Algorithm {
    type Err = JwtError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Algorithm::ALL
            .iter()
            .copied()
            .find(|alg| alg.as_str() == s)
            .ok_or_else(|| JwtError::UnsupportedAlgorithm(s.to_string()))
    }
}

impl KeyFamily {
    /// The JWK `kty` value for this family.
    pub fn jwk_kty(&self) -> &'static str {
        match self {
            KeyFamily::Hmac => "oct",
            KeyFamily::Rsa => "RSA",
            KeyFamily::Ecdsa => "EC",
            KeyFamily::EdDsa => "OKP",
        }
    }
}

impl Curve {
    pub fn as_str(&self) -> &'static str {
        match self {
            Curve::P256 => "P-256",
            Curve::P384 => "P-384",
            Curve::P521 => "P-521",
            Curve::Ed25519 => "Ed25519",
        }
    }
}

impl fmt::Display for Curve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Curve {
    type Err = JwtError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "P-256" | "p256" | "prime256v1" | "secp256r1" => Ok(Curve::P256),
            "P-384" | "p384" | "secp384r1" => Ok(Curve::P384),
            "P-521" | "p521" | "secp521r1" => Ok(Curve::P521),
            "Ed25519" | "ed25519" => Ok(Curve::Ed25519),
            other => Err(JwtError::Input(format!("unknown curve '{other}'"))),
        }
    }
}

/// Relative strength rating shown next to an algorithm
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SecurityLevel {
    Standard,
    High,
    VeryHigh,
}

/// Display metadata for a key-pair algorithm
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlgorithmInfo {
    pub name: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_size: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub curve: Option<Curve>,
    pub security: SecurityLevel,
}

/// Key-pair algorithms grouped by family
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SupportedAlgorithms {
    #[serde(rename = "RSA")]
    pub rsa: Vec<Algorithm>,
    #[serde(rename = "ECDSA")]
    pub ecdsa: Vec<Algorithm>,
    #[serde(rename = "EdDSA")]
    pub eddsa: Vec<Algorithm>,
}

/// List the algorithms a key pair can be generated for.
pub fn supported_algorithms() -> SupportedAlgorithms {
    let by_family = |family: KeyFamily| {
        Algorithm::ALL
            .iter()
            .copied()
            .filter(|alg| alg.family() == family)
            .collect::<Vec<_>>()
    };
    SupportedAlgorithms {
        rsa: by_family(KeyFamily::Rsa),
        ecdsa: by_family(KeyFamily::Ecdsa),
        eddsa: by_family(KeyFamily::EdDsa),
    }
}

/// Describe a key-pair algorithm by name.
///
/// Returns `None` for unknown names and for HMAC algorithms, which have no key pair.
///
/// # Example
/// ```rust
/// use jwt_keytool::algorithm_info;
///
/// let info = algorithm_info("ES256").unwrap();
/// assert_eq!(info.curve.unwrap().as_str(), "P-256");
/// assert!(algorithm_info("HS256").is_none());
/// ```
pub fn algorithm_info(alg: &str) -> Option<AlgorithmInfo> {
    let alg: Algorithm = alg.parse().ok()?;
    let info = match alg {
        Algorithm::RS256 => AlgorithmInfo {
            name: "RSASSA-PKCS1-v1_5 using SHA-256",
            key_size: Some(2048),
            curve: None,
            security: SecurityLevel::Standard,
        },
        Algorithm::RS384 => AlgorithmInfo {
            name: "RSASSA-PKCS1-v1_5 using SHA-384",
            key_size: Some(3072),
            curve: None,
            security: SecurityLevel::High,
        },
        Algorithm::RS512 => AlgorithmInfo {
            name: "RSASSA-PKCS1-v1_5 using SHA-512",
            key_size: Some(4096),
            curve: None,
            security: SecurityLevel::VeryHigh,
        },
        Algorithm::ES256 => AlgorithmInfo {
            name: "ECDSA using P-256 and SHA-256",
            key_size: None,
            curve: Some(Curve::P256),
            security: SecurityLevel::High,
        },
        Algorithm::ES384 => AlgorithmInfo {
            name: "ECDSA using P-384 and SHA-384",
            key_size: None,
            curve: Some(Curve::P384),
            security: SecurityLevel::VeryHigh,
        },
        Algorithm::ES512 => AlgorithmInfo {
            name: "ECDSA using P-521 and SHA-512",
            key_size: None,
            curve: Some(Curve::P521),
            security: SecurityLevel::VeryHigh,
        },
        Algorithm::EdDSA => AlgorithmInfo {
            name: "EdDSA using Ed25519",
            key_size: None,
            curve: Some(Curve::Ed25519),
            security: SecurityLevel::High,
        },
        Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => return None,
    };
    Some(info)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_round_trips_names() {
        for alg in Algorithm::ALL {
            assert_eq!(alg.as_str().parse::<Algorithm>().unwrap(), alg);
        }
    }

    #[test]
    fn test_parse_rejects_unknown() {
        let err = "UNSUPPORTED".parse::<Algorithm>().unwrap_err();
        assert!(matches!(err, JwtError::UnsupportedAlgorithm(name) if name == "UNSUPPORTED"));
        // names are case-sensitive, as in the JOSE registry
        assert!("hs256".parse::<Algorithm>().is_err());
    }

    #[test]
    fn test_families_and_curves() {
        assert_eq!(Algorithm::HS384.family(), KeyFamily::Hmac);
        assert_eq!(Algorithm::RS512.family(), KeyFamily::Rsa);
        assert_eq!(Algorithm::ES512.curve(), Some(Curve::P521));
        assert_eq!(Algorithm::EdDSA.curve(), Some(Curve::Ed25519));
        assert_eq!(Algorithm::RS256.curve(), None);
        assert!(Algorithm::ES512.to_jose().is_none());
    }

    #[test]
    fn test_supported_algorithms_serialization() {
        let json = serde_json::to_value(supported_algorithms()).unwrap();
        assert_eq!(json["RSA"], serde_json::json!(["RS256", "RS384", "RS512"]));
        assert_eq!(json["ECDSA"], serde_json::json!(["ES256", "ES384", "ES512"]));
        assert_eq!(json["EdDSA"], serde_json::json!(["EdDSA"]));
    }

    #[test]
    fn test_algorithm_info() {
        let rs = algorithm_info("RS256").unwrap();
        assert_eq!(rs.key_size, Some(2048));
        assert!(rs.curve.is_none());

        let json = serde_json::to_value(algorithm_info("ES384").unwrap()).unwrap();
        assert_eq!(json["curve"], "P-384");
        assert_eq!(json["security"], "veryHigh");
        assert!(json.get("keySize").is_none());

        assert!(algorithm_info("HS512").is_none());
        assert!(algorithm_info("nope").is_none());
    }

    #[test]
    fn test_curve_aliases() {
        assert_eq!("prime256v1".parse::<Curve>().unwrap(), Curve::P256);
        assert_eq!("P-521".parse::<Curve>().unwrap(), Curve::P521);
        assert!("P-192".parse::<Curve>().is_err());
    }
}
