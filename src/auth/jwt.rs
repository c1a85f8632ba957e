use anyhow::Result;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config::AppConfig;
use crate::domain::Role;

#[derive(Clone)]
pub struct JwtService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    audience: String,
    expiry: Duration,
}

impl JwtService {
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Ok(Self {
            encoding: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            issuer: config.jwt_issuer.clone(),
            audience: config.jwt_audience.clone(),
            expiry: Duration::minutes(config.jwt_expiry_minutes),
        })
    }

    pub fn generate_token(&self, user_id: i32, name: &str, role: Role) -> Result<String> {
        let now = Utc::now();
        let exp = now + self.expiry;
        let claims = Claims {
            sub: user_id,
            name: name.to_owned(),
            role,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            iat: now.timestamp() as usize,
            exp: exp.timestamp() as usize,
        };

        Ok(encode(&Header::default(), &claims, &self.encoding)?)
    }

    pub fn verify_token(&self, token: &str) -> Result<Claims> {
        let mut validation = Validation::default();
        validation.set_audience(&[self.audience.clone()]);
        validation.set_issuer(&[self.issuer.clone()]);
        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        Ok(data.claims)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i32,
    pub name: String,
    pub role: Role,
    pub iss: String,
    pub aud: String,
    pub iat: usize,
    pub exp: usize,
}

#[cfg(test)]
mod tests {
    use super::JwtService;
    use crate::config::AppConfig;
    use crate::domain::Role;

    fn test_config() -> AppConfig {
        AppConfig {
            database_url: "postgres://localhost/unused".to_string(),
            database_max_pool_size: 1,
            server_host: "127.0.0.1".to_string(),
            server_port: 0,
            jwt_secret: "test-secret".to_string(),
            jwt_issuer: "test-issuer".to_string(),
            jwt_audience: "test-audience".to_string(),
            jwt_expiry_minutes: 30,
            cors_allowed_origin: None,
        }
    }

    #[test]
    fn token_round_trip_preserves_identity() {
        let jwt = JwtService::from_config(&test_config()).unwrap();
        let token = jwt.generate_token(42, "dana", Role::Driver).unwrap();
        let claims = jwt.verify_token(&token).unwrap();
        assert_eq!(claims.sub, 42);
        assert_eq!(claims.name, "dana");
        assert_eq!(claims.role, Role::Driver);
    }

    #[test]
    fn token_from_other_secret_is_rejected() {
        let jwt = JwtService::from_config(&test_config()).unwrap();
        let mut other = test_config();
        other.jwt_secret = "different-secret".to_string();
        let forged = JwtService::from_config(&other)
            .unwrap()
            .generate_token(1, "mallory", Role::Admin)
            .unwrap();
        assert!(jwt.verify_token(&forged).is_err());
    }
}
