//! Signed bearer tokens.
//!
//! Tokens are compact HS256 strings, `header.claims.signature`, each segment
//! base64url without padding. Access tokens are verified by signature and
//! expiry alone. Refresh tokens are additionally tracked in a
//! [`RefreshLedger`]; when rotation is on, each one is exchangeable once.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::{
    auth::ledger::RefreshLedger,
    errors::Error,
    id::generate_token_id,
    models::{Identity, Role, UserId},
};

type HmacSha256 = Hmac<Sha256>;

const HEADER_JSON: &str = r#"{"alg":"HS256","typ":"JWT"}"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Access,
    Refresh,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: UserId,
    pub role: Role,
    pub typ: TokenKind,
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    fn new(identity: &Identity, typ: TokenKind, issued_at: DateTime<Utc>, ttl: Duration) -> Result<Self, Error> {
        let expires_at = issued_at.checked_add_signed(ttl).ok_or_else(|| Error::Config {
            message: format!("token lifetime of {}s overflows the clock", ttl.num_seconds()).into(),
        })?;
        Ok(Self {
            sub: identity.user,
            role: identity.role,
            typ,
            jti: generate_token_id(),
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
        })
    }

    pub fn identity(&self) -> Identity {
        Identity {
            user: self.sub,
            role: self.role,
        }
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.exp, 0).unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() >= self.exp
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

/// Result of a refresh exchange. `refresh` is present only when rotation is on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Refreshed {
    pub access: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh: Option<String>,
}

#[derive(Debug, Clone, Copy)]
pub struct TokenSettings {
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
    pub rotate_refresh: bool,
}

impl Default for TokenSettings {
    fn default() -> Self {
        Self {
            access_ttl: Duration::minutes(5),
            refresh_ttl: Duration::days(1),
            rotate_refresh: true,
        }
    }
}

pub struct TokenService<L> {
    signing_key: HmacSha256,
    settings: TokenSettings,
    ledger: L,
}

impl<L> TokenService<L>
where
    L: RefreshLedger,
{
    pub fn new(secret: &[u8], settings: TokenSettings, ledger: L) -> Self {
        Self {
            signing_key: HmacSha256::new_from_slice(secret).expect("HMAC can take key of any size"),
            settings,
            ledger,
        }
    }

    pub fn settings(&self) -> &TokenSettings {
        &self.settings
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub async fn issue(&self, identity: &Identity) -> Result<TokenPair, Error> {
        self.issue_at(identity, Utc::now()).await
    }

    pub async fn issue_at(&self, identity: &Identity, now: DateTime<Utc>) -> Result<TokenPair, Error> {
        let access = Claims::new(identity, TokenKind::Access, now, self.settings.access_ttl)?;
        let refresh = Claims::new(identity, TokenKind::Refresh, now, self.settings.refresh_ttl)?;
        if self.settings.rotate_refresh {
            self.ledger.register(&refresh.jti, refresh.expires_at(), now).await?;
        }
        log::info!("issued token pair for user {} (refresh jti {})", identity.user, refresh.jti);
        Ok(TokenPair {
            access: self.encode(&access)?,
            refresh: self.encode(&refresh)?,
        })
    }

    pub async fn refresh(&self, refresh_token: &str) -> Result<Refreshed, Error> {
        self.refresh_at(refresh_token, Utc::now()).await
    }

    pub async fn refresh_at(&self, refresh_token: &str, now: DateTime<Utc>) -> Result<Refreshed, Error> {
        let claims = self.verify(refresh_token, TokenKind::Refresh, now)?;
        let identity = claims.identity();

        if !self.settings.rotate_refresh {
            let access = Claims::new(&identity, TokenKind::Access, now, self.settings.access_ttl)?;
            return Ok(Refreshed {
                access: self.encode(&access)?,
                refresh: None,
            });
        }

        if !self.ledger.consume(&claims.jti, now).await? {
            log::warn!("refresh token {} presented after it was consumed", claims.jti);
            return Err(Error::InvalidOrExpiredToken);
        }
        let pair = self.issue_at(&identity, now).await?;
        Ok(Refreshed {
            access: pair.access,
            refresh: Some(pair.refresh),
        })
    }

    /// Resolves an access token to the identity it was issued for.
    pub fn identify(&self, access_token: &str) -> Result<Identity, Error> {
        self.identify_at(access_token, Utc::now())
    }

    pub fn identify_at(&self, access_token: &str, now: DateTime<Utc>) -> Result<Identity, Error> {
        self.verify(access_token, TokenKind::Access, now)
            .map(|claims| claims.identity())
            .map_err(|_| Error::Unauthenticated)
    }

    /// Decodes and checks signature, kind and expiry.
    pub fn verify(&self, token: &str, expected: TokenKind, now: DateTime<Utc>) -> Result<Claims, Error> {
        let claims = self.decode(token)?;
        if claims.typ != expected || claims.is_expired_at(now) {
            return Err(Error::InvalidOrExpiredToken);
        }
        Ok(claims)
    }

    /// Decodes a token after checking its signature, without looking at expiry.
    pub fn decode(&self, token: &str) -> Result<Claims, Error> {
        let mut segments = token.split('.');
        let (Some(header), Some(payload), Some(signature), None) =
            (segments.next(), segments.next(), segments.next(), segments.next())
        else {
            return Err(Error::InvalidOrExpiredToken);
        };

        if header != URL_SAFE_NO_PAD.encode(HEADER_JSON) {
            return Err(Error::InvalidOrExpiredToken);
        }

        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| Error::InvalidOrExpiredToken)?;
        let mut mac = self.signing_key.clone();
        mac.update(header.as_bytes());
        mac.update(b".");
        mac.update(payload.as_bytes());
        if mac.verify_slice(&signature).is_err() {
            log::warn!("rejected token with a bad signature");
            return Err(Error::InvalidOrExpiredToken);
        }

        let payload = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|_| Error::InvalidOrExpiredToken)?;
        serde_json::from_slice(&payload).map_err(|_| Error::InvalidOrExpiredToken)
    }

    fn encode(&self, claims: &Claims) -> Result<String, Error> {
        let header = URL_SAFE_NO_PAD.encode(HEADER_JSON);
        let payload = serde_json::to_vec(claims).map_err(|err| Error::other(format!("failed to encode claims: {err}")))?;
        let signing_input = format!("{header}.{}", URL_SAFE_NO_PAD.encode(payload));

        let mut mac = self.signing_key.clone();
        mac.update(signing_input.as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        Ok(format!("{signing_input}.{signature}"))
    }
}
