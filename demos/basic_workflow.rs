// demos/basic_workflow.rs

use jwt_keytool::{
    algorithm_info, format_timestamp, is_token_expired, supported_algorithms, Algorithm,
    JwtConfig, JwtService, KeyFormat, KeyMaterial, KeyPairOptions, SignRequest, VerifyRequest,
};
use serde_json::json;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // RUST_LOG=jwt_keytool=debug shows key imports and verification steps
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();

    println!("JWT Keytool Basic Workflow Example");

    // 1. Setup the service
    let jwt_config = JwtConfig {
        default_ttl: Some(3600), // 1 hour
        issue_jti: true,
        leeway: 30,
        ..Default::default()
    };
    let service = JwtService::new(jwt_config);

    // 2. List what can be generated
    let supported = supported_algorithms();
    println!("Key-pair algorithms: {}", serde_json::to_string(&supported)?);
    if let Some(info) = algorithm_info("ES256") {
        println!("ES256: {} ({:?})", info.name, info.security);
    }

    // 3. Shared-secret token
    println!("\nHMAC token...");
    let token = service.sign(SignRequest::new(
        Algorithm::HS256,
        KeyMaterial::secret("example-secret-key"),
        json!({ "sub": "1234567890", "name": "John Doe" }),
    ))?;
    println!("Created JWT: {}...", &token[..40]);

    let data = service.verify(VerifyRequest::new(&token, KeyMaterial::secret("example-secret-key")))?;
    let exp = data.payload["exp"].as_i64().unwrap_or_default();
    println!("Verified token for: {}", data.payload["name"]);
    println!("Expires at: {} (expired: {})", format_timestamp(exp), is_token_expired(exp));

    // 4. Asymmetric tokens, one per export format
    for (alg, format) in [
        (Algorithm::ES256, KeyFormat::Pem),
        (Algorithm::EdDSA, KeyFormat::Jwk),
        (Algorithm::ES512, KeyFormat::Pem),
    ] {
        println!("\n{} key pair as {}...", alg, format);
        let pair = service.generate_key_pair(KeyPairOptions::new(alg).with_format(format))?;
        println!("Public key fingerprint: {}", pair.fingerprint());

        let token = service.sign(SignRequest::new(
            alg,
            KeyMaterial::private_key(pair.private_key.clone()),
            json!({ "sub": "device-42", "scope": ["read", "write"] }),
        ))?;

        match service.verify(
            VerifyRequest::new(&token, KeyMaterial::public_key(pair.public_key.clone()))
                .with_algorithms([alg]),
        ) {
            Ok(data) => println!("Token verified, scope: {}", data.payload["scope"]),
            Err(e) => println!("Token verification failed: {}", e),
        }
    }

    // 5. A wrong secret is rejected
    match service.verify(VerifyRequest::new(&token, KeyMaterial::secret("wrong-secret"))) {
        Ok(_) => println!("\nUnexpected: forged token accepted"),
        Err(e) => println!("\nRejected as expected: {}", e),
    }

    println!("\nExample completed!");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_example_runs() {
        // Test that the example runs without panicking
        main().unwrap();
    }

    #[test]
    fn test_pem_pair_round_trip() {
        let service = JwtService::new(JwtConfig::default());
        let pair = service
            .generate_key_pair(KeyPairOptions::new(Algorithm::ES384))
            .unwrap();
        assert!(jwt_keytool::validate_key_pair_format(&pair));
        assert!(jwt_keytool::verify_key_pair(&pair).is_ok());
    }
}
