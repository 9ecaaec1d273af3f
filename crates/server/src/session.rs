use axum::http::{header, HeaderMap};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use server_api::Session;
use shared::domain::{Identity, UserId};
use tracing::debug;

pub const SESSION_COOKIE: &str = "tablet_session";

/// Signs and reads the session cookie.
#[derive(Clone)]
pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_seconds: i64,
    secure: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: i64,
    name: String,
    adm: bool,
    iat: i64,
    exp: i64,
}

impl SessionKeys {
    pub fn new(secret: &str, ttl_seconds: i64, secure: bool) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl_seconds,
            secure,
        }
    }

    pub fn issue(&self, identity: &Identity) -> Result<String, jsonwebtoken::errors::Error> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.ttl_seconds);
        let claims = Claims {
            sub: identity.user_id.0,
            name: identity.username.clone(),
            adm: identity.is_admin,
            iat: now.timestamp(),
            exp: exp.timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
    }

    /// Tampered or expired tokens yield no session.
    pub fn verify(&self, token: &str) -> Option<Session> {
        match decode::<Claims>(token, &self.decoding, &Validation::new(Algorithm::HS256)) {
            Ok(data) => Some(Session {
                authenticated: true,
                user_id: UserId(data.claims.sub),
                username: data.claims.name,
                is_admin: data.claims.adm,
            }),
            Err(error) => {
                debug!(%error, "rejected session token");
                None
            }
        }
    }

    pub fn session_from_headers(&self, headers: &HeaderMap) -> Option<Session> {
        cookie_value(headers, SESSION_COOKIE).and_then(|token| self.verify(token))
    }

    pub fn set_cookie(&self, token: &str) -> String {
        format!(
            "{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}{}",
            self.ttl_seconds,
            self.secure_attr()
        )
    }

    pub fn clear_cookie(&self) -> String {
        format!(
            "{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0{}",
            self.secure_attr()
        )
    }

    fn secure_attr(&self) -> &'static str {
        if self.secure {
            "; Secure"
        } else {
            ""
        }
    }
}

fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn identity() -> Identity {
        Identity {
            user_id: UserId(7),
            username: "kowalski".into(),
            is_admin: true,
        }
    }

    #[test]
    fn issued_token_verifies_back_to_the_identity() {
        let keys = SessionKeys::new("secret", 60, false);
        let token = keys.issue(&identity()).expect("token");
        let session = keys.verify(&token).expect("session");
        assert!(session.authenticated);
        assert_eq!(session.identity(), identity());
    }

    #[test]
    fn token_signed_with_another_secret_is_rejected() {
        let token = SessionKeys::new("other", 60, false)
            .issue(&identity())
            .expect("token");
        assert!(SessionKeys::new("secret", 60, false).verify(&token).is_none());
    }

    #[test]
    fn expired_token_is_rejected() {
        let keys = SessionKeys::new("secret", -3600, false);
        let token = keys.issue(&identity()).expect("token");
        assert!(keys.verify(&token).is_none());
    }

    #[test]
    fn reads_session_cookie_among_others() {
        let keys = SessionKeys::new("secret", 60, false);
        let token = keys.issue(&identity()).expect("token");
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_str(&format!("theme=dark; {SESSION_COOKIE}={token}")).expect("header"),
        );
        assert!(keys.session_from_headers(&headers).is_some());
        assert!(keys.session_from_headers(&HeaderMap::new()).is_none());
    }

    #[test]
    fn cookie_attributes_follow_settings() {
        let keys = SessionKeys::new("secret", 60, true);
        let cookie = keys.set_cookie("abc");
        assert!(cookie.starts_with("tablet_session=abc;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.ends_with("; Secure"));
        assert!(keys.clear_cookie().contains("Max-Age=0"));
    }
}
