//! ES256 developer tokens for the WeatherKit REST API.
//!
//! WeatherKit expects the token identifier (`jti`) in the JOSE header, which
//! `jsonwebtoken::Header` cannot carry, so the header and claims are encoded
//! here and only the signature is delegated to `jsonwebtoken::crypto`.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, EncodingKey};
use serde::{Deserialize, Serialize};

use crate::{error::WeatherKitError, model::WeatherKitRequest};

/// Tokens are valid for 180 days from issue.
pub const TOKEN_LIFETIME_SECS: i64 = 60 * 60 * 24 * 180;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    pub iat: i64,
    pub exp: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
}

#[derive(Debug, Serialize)]
struct TokenHeader<'a> {
    alg: &'static str,
    typ: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    kid: Option<&'a str>,
    jti: String,
}

/// Claims for a token issued at `issued_at`.
pub fn claims(request: &WeatherKitRequest, issued_at: DateTime<Utc>) -> Claims {
    let iat = issued_at.timestamp();
    Claims {
        iss: request.team_id.clone(),
        iat,
        exp: iat + TOKEN_LIFETIME_SECS,
        sub: request.service_id.clone(),
    }
}

/// Sign a WeatherKit token with a PEM-encoded PKCS#8 P-256 private key.
pub fn sign(
    request: &WeatherKitRequest,
    key_pem: &[u8],
    issued_at: DateTime<Utc>,
) -> Result<String, WeatherKitError> {
    let key = EncodingKey::from_ec_pem(key_pem).map_err(WeatherKitError::InvalidKey)?;

    let header = TokenHeader {
        alg: "ES256",
        typ: "JWT",
        kid: request.key_id.as_deref(),
        jti: request.token_id(),
    };
    let claims = claims(request, issued_at);

    let message = format!("{}.{}", encode_segment(&header)?, encode_segment(&claims)?);
    let signature = jsonwebtoken::crypto::sign(message.as_bytes(), &key, Algorithm::ES256)
        .map_err(WeatherKitError::Signing)?;

    Ok(format!("{message}.{signature}"))
}

fn encode_segment<T: Serialize>(value: &T) -> Result<String, WeatherKitError> {
    let json = serde_json::to_vec(value).map_err(WeatherKitError::TokenEncoding)?;
    Ok(URL_SAFE_NO_PAD.encode(json))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use chrono::TimeZone;
    use jsonwebtoken::{DecodingKey, Validation};
    use serde_json::Value;

    const PRIVATE_KEY: &str = include_str!("../testdata/AuthKey_TEST1234.p8");
    const PUBLIC_KEY: &str = include_str!("../testdata/AuthKey_TEST1234.pub.pem");

    fn request() -> WeatherKitRequest {
        WeatherKitRequest {
            team_id: Some("TEAM123".into()),
            service_id: Some("com.example.mirror".into()),
            key_id: Some("TEST1234".into()),
            ..Default::default()
        }
    }

    fn header_json(token: &str) -> Value {
        let segment = token.split('.').next().unwrap();
        serde_json::from_slice(&URL_SAFE_NO_PAD.decode(segment).unwrap()).unwrap()
    }

    #[test]
    fn expiry_is_180_days_after_issue() {
        let issued_at = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let claims = claims(&request(), issued_at);

        assert_eq!(claims.iat, issued_at.timestamp());
        assert_eq!(claims.exp, claims.iat + 15_552_000);
        assert_eq!(claims.iss.as_deref(), Some("TEAM123"));
        assert_eq!(claims.sub.as_deref(), Some("com.example.mirror"));
    }

    #[test]
    fn signed_token_verifies_with_public_key() {
        let token = sign(&request(), PRIVATE_KEY.as_bytes(), Utc::now()).unwrap();

        let key = DecodingKey::from_ec_pem(PUBLIC_KEY.as_bytes()).unwrap();
        let data = jsonwebtoken::decode::<Claims>(&token, &key, &Validation::new(Algorithm::ES256))
            .expect("token must verify");

        assert_eq!(data.claims.exp, data.claims.iat + TOKEN_LIFETIME_SECS);
        assert_eq!(data.claims.iss.as_deref(), Some("TEAM123"));
        assert_eq!(data.header.kid.as_deref(), Some("TEST1234"));
    }

    #[test]
    fn header_carries_key_and_token_ids() {
        let token = sign(&request(), PRIVATE_KEY.as_bytes(), Utc::now()).unwrap();
        let header = header_json(&token);

        assert_eq!(header["alg"], "ES256");
        assert_eq!(header["kid"], "TEST1234");
        assert_eq!(header["jti"], "TEAM123.com.example.mirror");
    }

    #[test]
    fn absent_identifiers_are_left_out_of_the_token() {
        let token = sign(&WeatherKitRequest::default(), PRIVATE_KEY.as_bytes(), Utc::now()).unwrap();
        let header = header_json(&token);

        assert!(header.get("kid").is_none());
        assert_eq!(header["jti"], ".");

        let payload = token.split('.').nth(1).unwrap();
        let claims: Value = serde_json::from_slice(&URL_SAFE_NO_PAD.decode(payload).unwrap()).unwrap();
        assert!(claims.get("iss").is_none());
        assert!(claims.get("sub").is_none());
    }

    #[test]
    fn garbage_key_is_a_configuration_error() {
        let err = sign(&request(), b"not a key", Utc::now()).unwrap_err();

        assert!(matches!(err, WeatherKitError::InvalidKey(_)));
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }
}
