use crate::{
    algorithm::Algorithm,
    crypto::{
        claims::{claim_i64, normalize_claims, now},
        import::{import_signing_key, import_verifying_key, KeyMaterial},
        jwk::{b64url, b64url_decode},
    },
    error::{JwtError, Result},
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

/// Decoded token: header, payload and the raw signature segment
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TokenData {
    pub header: Map<String, Value>,
    pub payload: Map<String, Value>,
    /// Third compact segment, as found in the token (empty if absent)
    pub signature: String,
}

impl TokenData {
    /// Header `alg`, if present and a string.
    pub fn algorithm(&self) -> Option<&str> {
        self.header.get("alg").and_then(Value::as_str)
    }
}

/// Input for [`generate_jwt`]
#[derive(Debug)]
pub struct SignRequest {
    pub algorithm: Algorithm,
    pub key: KeyMaterial,
    /// Extra header fields; `alg` and `typ` here are always overridden
    pub header: Map<String, Value>,
    pub payload: Value,
}

impl SignRequest {
    pub fn new(algorithm: Algorithm, key: KeyMaterial, payload: Value) -> Self {
        Self {
            algorithm,
            key,
            header: Map::new(),
            payload,
        }
    }

    pub fn with_header(mut self, header: Map<String, Value>) -> Self {
        self.header = header;
        self
    }
}

/// Input for [`verify_jwt`]
#[derive(Debug)]
pub struct VerifyRequest {
    pub token: String,
    pub key: KeyMaterial,
    /// Accepted header algorithms; empty accepts any that fits the key
    pub algorithms: Vec<Algorithm>,
    /// Clock skew tolerated for `exp` and `nbf`, in seconds; `None` means 0
    pub leeway: Option<u64>,
    pub issuer: Option<String>,
    pub audience: Option<String>,
}

impl VerifyRequest {
    pub fn new(token: impl Into<String>, key: KeyMaterial) -> Self {
        Self {
            token: token.into(),
            key,
            algorithms: Vec::new(),
            leeway: None,
            issuer: None,
            audience: None,
        }
    }

    pub fn with_algorithms(mut self, algorithms: impl IntoIterator<Item = Algorithm>) -> Self {
        self.algorithms = algorithms.into_iter().collect();
        self
    }

    pub fn with_leeway(mut self, leeway: u64) -> Self {
        self.leeway = Some(leeway);
        self
    }

    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = Some(audience.into());
        self
    }
}

/// Options for [`decode_jwt_with`]
#[derive(Clone, Copy, Debug, Default)]
pub struct DecodeOptions {
    /// Flatten a payload shaped like a serialized [`TokenData`]
    pub unwrap_nested: bool,
}

fn encode_segment(value: &impl Serialize) -> Result<String> {
    let json = serde_json::to_vec(value).map_err(|e| JwtError::Input(e.to_string()))?;
    Ok(b64url(json))
}

/// Creates a signed compact JWT
///
/// The header is the caller's extra fields with `alg` and `typ: "JWT"` set
/// from the request. Registered claims in the payload are normalized (see
/// [`normalize_claims`]); everything else is copied verbatim.
///
/// # Returns
/// * `Ok(String)` - `base64url(header).base64url(payload).base64url(signature)`
/// * `Err(JwtError::Generation)` - wrapping whatever went wrong
///
/// # Example
/// ```rust
/// use jwt_keytool::{generate_jwt, decode_jwt, Algorithm, KeyMaterial, SignRequest};
/// use serde_json::json;
///
/// let request = SignRequest::new(
///     Algorithm::HS256,
///     KeyMaterial::secret("test-secret"),
///     json!({ "sub": "1234567890", "name": "John Doe", "iat": 1516239022 }),
/// );
/// let token = generate_jwt(&request).unwrap();
/// assert_eq!(token.matches('.').count(), 2);
/// assert_eq!(decode_jwt(&token).unwrap().payload["name"], "John Doe");
/// ```
pub fn generate_jwt(request: &SignRequest) -> Result<String> {
    sign_token(request).map_err(|e| {
        warn!("JWT generation failed: {}", e);
        JwtError::generation(e)
    })
}

fn sign_token(request: &SignRequest) -> Result<String> {
    let payload = match &request.payload {
        Value::Object(map) => map,
        Value::Null => return Err(JwtError::Input("payload is required".to_string())),
        _ => return Err(JwtError::Input("payload must be a JSON object".to_string())),
    };
    let signing_key = import_signing_key(request.algorithm, &request.key)?;
    let claims = normalize_claims(payload, now())?;

    let mut header = request.header.clone();
    header.insert("alg".to_string(), Value::from(request.algorithm.as_str()));
    header.insert("typ".to_string(), Value::from("JWT"));

    let signing_input = format!("{}.{}", encode_segment(&header)?, encode_segment(&claims)?);
    let signature = signing_key.sign(signing_input.as_bytes())?;
    debug!("Signed {} token", request.algorithm);
    Ok(format!("{signing_input}.{signature}"))
}

fn split_token(token: &str) -> Result<[&str; 3]> {
    let parts: Vec<&str> = token.trim().split('.').collect();
    match parts.as_slice() {
        [header, payload, signature] => Ok([*header, *payload, *signature]),
        _ => Err(JwtError::Format("token must contain three parts".to_string())),
    }
}

fn decode_segment(segment: &str, what: &str) -> Result<Map<String, Value>> {
    let bytes = b64url_decode(segment)
        .map_err(|e| JwtError::Format(format!("invalid {what}: {e}")))?;
    match serde_json::from_slice(&bytes) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(JwtError::Format(format!("invalid {what}: not a JSON object"))),
        Err(e) => Err(JwtError::Format(format!("invalid {what}: {e}"))),
    }
}

/// Decodes a compact JWT without checking its signature
///
/// # Errors
/// `JwtError::Format` when the token does not have three segments or the
/// header/payload are not base64url JSON objects.
///
/// # Example
/// ```rust
/// use jwt_keytool::{decode_jwt, JwtError};
///
/// // {"alg":"HS256","typ":"JWT"} . {"sub":"1234567890"} . signature
/// let token = "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9.eyJzdWIiOiIxMjM0NTY3ODkwIn0.c2ln";
/// let data = decode_jwt(token).unwrap();
/// assert_eq!(data.header["alg"], "HS256");
/// assert_eq!(data.payload["sub"], "1234567890");
///
/// assert!(matches!(decode_jwt("a.b"), Err(JwtError::Format(_))));
/// ```
pub fn decode_jwt(token: &str) -> Result<TokenData> {
    decode_jwt_with(token, &DecodeOptions::default())
}

/// [`decode_jwt`] with explicit options.
pub fn decode_jwt_with(token: &str, options: &DecodeOptions) -> Result<TokenData> {
    let [header, payload, signature] = split_token(token)?;
    let header = decode_segment(header, "header")?;
    let mut payload = decode_segment(payload, "payload")?;
    if options.unwrap_nested {
        if let Some(flattened) = unwrap_nested(&payload) {
            debug!("Unwrapped nested token payload");
            payload = flattened;
        }
    }
    Ok(TokenData {
        header,
        payload,
        signature: signature.to_string(),
    })
}

/// Flatten a payload that is itself a serialized decode result
///
/// The inner payload's claims come first, then the outer envelope under
/// `_nestedJWT`, `_outerHeader`, `_outerSignature`, `_outerIsValid` and
/// `_outerError`. Returns `None` when the payload does not have that shape
/// or the inner payload is not an object.
fn unwrap_nested(payload: &Map<String, Value>) -> Option<Map<String, Value>> {
    if !["header", "payload", "signature"]
        .iter()
        .all(|key| payload.contains_key(*key))
    {
        return None;
    }
    let inner = match payload.get("payload")? {
        Value::Object(map) => map.clone(),
        Value::String(json) => match serde_json::from_str(json) {
            Ok(Value::Object(map)) => map,
            _ => return None,
        },
        _ => return None,
    };
    let outer = |key: &str| payload.get(key).cloned().unwrap_or(Value::Null);
    let mut flattened = inner;
    flattened.insert("_nestedJWT".to_string(), Value::Bool(true));
    flattened.insert("_outerHeader".to_string(), outer("header"));
    flattened.insert("_outerSignature".to_string(), outer("signature"));
    flattened.insert("_outerIsValid".to_string(), outer("isValid"));
    flattened.insert("_outerError".to_string(), outer("error"));
    Some(flattened)
}

/// Verifies a compact JWT and returns its content
///
/// The header `alg` must be in the request's allow-list (when given) and
/// must fit the key material: a secret only verifies HMAC tokens and a
/// public key only asymmetric ones. After the signature, `exp` and `nbf`
/// are enforced, then the optional issuer and audience.
///
/// # Returns
/// * `Ok(TokenData)` - header, payload and signature segment
/// * `Err(JwtError::Verification)` - wrapping the reason
///
/// # Example
/// ```rust
/// use jwt_keytool::{generate_jwt, verify_jwt, Algorithm, JwtError, KeyMaterial, SignRequest, VerifyRequest};
/// use serde_json::json;
///
/// let token = generate_jwt(&SignRequest::new(
///     Algorithm::HS256,
///     KeyMaterial::secret("your-secret"),
///     json!({ "sub": "alice", "iss": "auth.example.com", "exp": "1h" }),
/// ))
/// .unwrap();
///
/// let request = VerifyRequest::new(&token, KeyMaterial::secret("your-secret"))
///     .with_algorithms([Algorithm::HS256])
///     .with_issuer("auth.example.com");
/// assert_eq!(verify_jwt(&request).unwrap().payload["sub"], "alice");
///
/// let forged = VerifyRequest::new(&token, KeyMaterial::secret("wrong-secret"));
/// assert!(matches!(verify_jwt(&forged), Err(JwtError::Verification(_))));
/// ```
pub fn verify_jwt(request: &VerifyRequest) -> Result<TokenData> {
    verify_token(request).map_err(|e| {
        warn!("JWT verification failed: {}", e);
        JwtError::verification(e)
    })
}

fn verify_token(request: &VerifyRequest) -> Result<TokenData> {
    let [header_b64, payload_b64, signature] = split_token(&request.token)?;
    let header = decode_segment(header_b64, "header")?;
    let alg_name = header
        .get("alg")
        .and_then(Value::as_str)
        .ok_or_else(|| JwtError::Format("invalid header: missing 'alg'".to_string()))?;
    let algorithm: Algorithm = alg_name.parse()?;

    if !request.algorithms.is_empty() && !request.algorithms.contains(&algorithm) {
        return Err(JwtError::AlgorithmMismatch(format!(
            "token algorithm {algorithm} is not allowed"
        )));
    }
    let secret_key = matches!(request.key, KeyMaterial::Secret(_));
    if secret_key != algorithm.is_symmetric() {
        return Err(JwtError::AlgorithmMismatch(format!(
            "token algorithm {algorithm} does not match the supplied key material"
        )));
    }

    let verifying_key = import_verifying_key(algorithm, &request.key)?;
    let signing_input = format!("{header_b64}.{payload_b64}");
    verifying_key.verify(signing_input.as_bytes(), signature)?;

    let payload = decode_segment(payload_b64, "payload")?;
    validate_claims(&payload, request, now())?;
    debug!("Verified {} token", algorithm);
    Ok(TokenData {
        header,
        payload,
        signature: signature.to_string(),
    })
}

fn validate_claims(claims: &Map<String, Value>, request: &VerifyRequest, now: i64) -> Result<()> {
    let leeway = i64::try_from(request.leeway.unwrap_or(0)).unwrap_or(i64::MAX);
    if let Some(exp) = claim_i64(claims, "exp")? {
        if now.saturating_sub(leeway) >= exp {
            return Err(JwtError::Expired);
        }
    }
    if let Some(nbf) = claim_i64(claims, "nbf")? {
        if now.saturating_add(leeway) < nbf {
            return Err(JwtError::NotYetValid);
        }
    }
    if let Some(expected) = &request.issuer {
        if claims.get("iss").and_then(Value::as_str) != Some(expected.as_str()) {
            return Err(JwtError::Claim(format!("issuer must be '{expected}'")));
        }
    }
    if let Some(expected) = &request.audience {
        let matches = match claims.get("aud") {
            Some(Value::String(aud)) => aud == expected,
            Some(Value::Array(auds)) => auds.iter().any(|a| a.as_str() == Some(expected.as_str())),
            _ => false,
        };
        if !matches {
            return Err(JwtError::Claim(format!("audience must include '{expected}'")));
        }
    }
    Ok(())
}
