//! Bearer-token verification and the role/capability table. Token issuance
//! lives in the identity service; this side only checks that a presented
//! token carries a valid HMAC-SHA256 signature over its `user:role` payload
//! and that the role grants the requested capability.

use std::collections::HashMap;

use constant_time_eq::constant_time_eq;
use hmac::{Hmac, Mac};
use once_cell::sync::Lazy;
use sha2::Sha256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "user" => Some(Role::User),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    GetMovies,
    ManageMovies,
    VoteMovies,
}

static ROLE_RIGHTS: Lazy<HashMap<Role, &'static [Capability]>> = Lazy::new(|| {
    HashMap::from([
        (
            Role::User,
            &[Capability::GetMovies, Capability::VoteMovies][..],
        ),
        (
            Role::Admin,
            &[Capability::GetMovies, Capability::ManageMovies][..],
        ),
    ])
});

pub fn role_allows(role: Role, capability: Capability) -> bool {
    ROLE_RIGHTS
        .get(&role)
        .is_some_and(|rights| rights.contains(&capability))
}

/// The authenticated caller, as recovered from a verified token.
#[derive(Debug, Clone)]
pub struct Identity {
    pub user_name: String,
    pub role: Role,
}

/// Builds a `userName:role:signature` token. Counterpart of `verify_token`,
/// exposed for tests and operator tooling.
pub fn sign_token(user_name: &str, role: Role, secret: &str) -> String {
    let payload = format!("{}:{}", user_name, role.as_str());
    format!("{}:{}", payload, hmac_hex(&payload, secret))
}

fn hmac_hex(payload: &str, secret: &str) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(payload.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Verifies a token's signature in constant time and recovers the identity.
/// Any malformed, tampered or wrongly-signed token yields `None`.
pub fn verify_token(token: &str, secret: &str) -> Option<Identity> {
    let (payload, sig_hex) = token.rsplit_once(':')?;
    let (user_name, role_str) = payload.rsplit_once(':')?;
    let role = Role::parse(role_str)?;
    if user_name.is_empty() {
        return None;
    }

    let presented = hex::decode(sig_hex).ok()?;
    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(secret.as_bytes()) else {
        return None;
    };
    mac.update(payload.as_bytes());
    let computed = mac.finalize().into_bytes();
    if presented.len() != computed.len() || !constant_time_eq(&computed, &presented) {
        return None;
    }

    Some(Identity {
        user_name: user_name.to_string(),
        role,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    #[test]
    fn signed_tokens_verify_round_trip() {
        let token = sign_token("alice", Role::User, SECRET);
        let identity = verify_token(&token, SECRET).unwrap();
        assert_eq!(identity.user_name, "alice");
        assert_eq!(identity.role, Role::User);
    }

    #[test]
    fn tampered_payload_or_wrong_secret_is_rejected() {
        let token = sign_token("alice", Role::User, SECRET);
        let promoted = token.replacen(":user:", ":admin:", 1);
        assert!(verify_token(&promoted, SECRET).is_none());
        assert!(verify_token(&token, "other-secret").is_none());
    }

    #[test]
    fn malformed_tokens_are_rejected() {
        assert!(verify_token("", SECRET).is_none());
        assert!(verify_token("alice", SECRET).is_none());
        assert!(verify_token("alice:user:nothex", SECRET).is_none());
        assert!(verify_token("alice:superuser:00", SECRET).is_none());
    }

    #[test]
    fn user_names_may_contain_colons() {
        let token = sign_token("acme:alice", Role::Admin, SECRET);
        let identity = verify_token(&token, SECRET).unwrap();
        assert_eq!(identity.user_name, "acme:alice");
    }

    #[test]
    fn role_rights_match_the_static_table() {
        assert!(role_allows(Role::User, Capability::VoteMovies));
        assert!(role_allows(Role::User, Capability::GetMovies));
        assert!(!role_allows(Role::User, Capability::ManageMovies));

        assert!(role_allows(Role::Admin, Capability::ManageMovies));
        assert!(role_allows(Role::Admin, Capability::GetMovies));
        assert!(!role_allows(Role::Admin, Capability::VoteMovies));
    }
}
