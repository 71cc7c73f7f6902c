//! Keystone token exchange and per-tenant token state
//!
//! A tenant with no entry is unauthenticated. A 401 from the store is the
//! only expiry signal; nothing here tracks token lifetimes.

use std::collections::HashMap;

use serde::Serialize;
use tokio::sync::Mutex;

/// Response header carrying the issued token
pub const SUBJECT_TOKEN_HEADER: &str = "X-Subject-Token";

/// Request header carrying the token on store calls
pub const AUTH_TOKEN_HEADER: &str = "X-Auth-Token";

/// Token state of one tenant
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenState {
    /// Token accepted so far
    Authenticated(String),
    /// Token rejected by the store, kept for the renewal grant
    Expired(String),
}

impl TokenState {
    pub fn token(&self) -> &str {
        match self {
            TokenState::Authenticated(token) | TokenState::Expired(token) => token,
        }
    }
}

/// Token state keyed by tenant (subservice)
#[derive(Debug, Default)]
pub struct TokenRegistry {
    states: Mutex<HashMap<String, TokenState>>,
}

impl TokenRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state; `None` means unauthenticated
    pub async fn get(&self, tenant: &str) -> Option<TokenState> {
        self.states.lock().await.get(tenant).cloned()
    }

    pub async fn set_authenticated(&self, tenant: &str, token: String) {
        self.states
            .lock()
            .await
            .insert(tenant.to_string(), TokenState::Authenticated(token));
    }

    /// Mark `token` expired, unless it was already replaced
    pub async fn mark_expired(&self, tenant: &str, token: &str) {
        let mut states = self.states.lock().await;
        if let Some(state) = states.get_mut(tenant) {
            if state.token() == token {
                *state = TokenState::Expired(token.to_string());
            }
        }
    }
}

/// Body of `POST /v3/auth/tokens`
#[derive(Debug, Serialize)]
pub struct KeystoneRequest<'a> {
    auth: AuthBody<'a>,
}

#[derive(Debug, Serialize)]
struct AuthBody<'a> {
    identity: Identity<'a>,
    scope: Scope<'a>,
}

#[derive(Debug, Serialize)]
struct Identity<'a> {
    methods: [&'static str; 1],
    #[serde(skip_serializing_if = "Option::is_none")]
    password: Option<PasswordIdentity<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    token: Option<TokenIdentity<'a>>,
}

#[derive(Debug, Serialize)]
struct PasswordIdentity<'a> {
    user: User<'a>,
}

#[derive(Debug, Serialize)]
struct User<'a> {
    domain: Named<'a>,
    name: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct TokenIdentity<'a> {
    id: &'a str,
}

#[derive(Debug, Serialize)]
struct Scope<'a> {
    project: Project<'a>,
}

#[derive(Debug, Serialize)]
struct Project<'a> {
    domain: Named<'a>,
    name: &'a str,
}

#[derive(Debug, Serialize)]
struct Named<'a> {
    name: &'a str,
}

impl<'a> KeystoneRequest<'a> {
    /// Full credentials grant, user domain = service
    pub fn password(service: &'a str, tenant: &'a str, user: &'a str, password: &'a str) -> Self {
        Self::scoped(
            service,
            tenant,
            Identity {
                methods: ["password"],
                password: Some(PasswordIdentity {
                    user: User {
                        domain: Named { name: service },
                        name: user,
                        password,
                    },
                }),
                token: None,
            },
        )
    }

    /// Renewal grant carrying the current token
    pub fn token(service: &'a str, tenant: &'a str, token: &'a str) -> Self {
        Self::scoped(
            service,
            tenant,
            Identity {
                methods: ["token"],
                password: None,
                token: Some(TokenIdentity { id: token }),
            },
        )
    }

    fn scoped(service: &'a str, tenant: &'a str, identity: Identity<'a>) -> Self {
        Self {
            auth: AuthBody {
                identity,
                scope: Scope {
                    project: Project {
                        domain: Named { name: service },
                        name: tenant,
                    },
                },
            },
        }
    }
}
