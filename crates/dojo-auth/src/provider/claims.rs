//! ID 토큰 클레임 해석.
//!
//! 서명 검증은 제공자가 토큰을 발급하는 시점에 끝났다고 보고, 여기서는
//! 페이로드만 읽어 [`Identity`]로 변환합니다.

use dojo_core::Identity;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};

use crate::AuthResult;

/// ID 토큰 페이로드.
#[derive(Debug, Deserialize)]
struct IdTokenClaims {
    sub: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    nickname: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    email_verified: Option<bool>,
    #[serde(default)]
    picture: Option<String>,
    #[serde(flatten)]
    extra: HashMap<String, serde_json::Value>,
}

/// ID 토큰을 [`Identity`]로 변환합니다.
///
/// 네임스페이스가 붙은 커스텀 클레임(`https://...`)만 `Identity::claims`에
/// 보존됩니다.
pub fn decode_id_token(id_token: &str) -> AuthResult<Identity> {
    let mut validation = Validation::new(Algorithm::RS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims = HashSet::new();

    let data = decode::<IdTokenClaims>(id_token, &DecodingKey::from_secret(&[]), &validation)?;
    let claims = data.claims;

    let display_name = claims
        .name
        .or(claims.nickname)
        .or_else(|| claims.email.clone())
        .unwrap_or_else(|| claims.sub.clone());

    Ok(Identity {
        subject_id: claims.sub,
        display_name,
        email: claims.email.unwrap_or_default(),
        avatar_url: claims.picture.unwrap_or_default(),
        email_verified: claims.email_verified.unwrap_or(false),
        claims: claims
            .extra
            .into_iter()
            .filter(|(key, _)| key.contains("://"))
            .collect(),
    })
}
