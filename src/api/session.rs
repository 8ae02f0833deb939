use time::OffsetDateTime;

use crate::api::{
    error::{ApiError, missing_credential, protocol_error},
    payloads::Address,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    Unauthenticated,
    Authenticated { uid: String },
}

/// Source of the `time` parameter and `ddmc-time` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestClock {
    System,
    Fixed(String),
}

impl RequestClock {
    pub fn unix_timestamp(&self) -> String {
        match self {
            RequestClock::System => OffsetDateTime::now_utc().unix_timestamp().to_string(),
            RequestClock::Fixed(value) => value.clone(),
        }
    }
}

/// Per-run credential, identity and address context.
///
/// Identity moves from `Unauthenticated` to `Authenticated` exactly once;
/// the address may be rebound, which only affects later calls.
#[derive(Debug, Clone)]
pub struct Session {
    cookie: String,
    identity: Identity,
    address: Option<Address>,
    clock: RequestClock,
}

impl Session {
    pub fn new(cookie: impl Into<String>) -> Result<Self, ApiError> {
        let cookie = cookie.into();
        if cookie.trim().is_empty() {
            return Err(missing_credential("session cookie cannot be empty"));
        }

        Ok(Self {
            cookie,
            identity: Identity::Unauthenticated,
            address: None,
            clock: RequestClock::System,
        })
    }

    pub fn with_clock(mut self, clock: RequestClock) -> Self {
        self.clock = clock;
        self
    }

    pub fn cookie(&self) -> &str {
        &self.cookie
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn uid(&self) -> Option<&str> {
        match &self.identity {
            Identity::Authenticated { uid } => Some(uid),
            Identity::Unauthenticated => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self.identity, Identity::Authenticated { .. })
    }

    pub(crate) fn authenticate(&mut self, uid: String) -> Result<(), ApiError> {
        if uid.trim().is_empty() {
            return Err(protocol_error("identity lookup returned an empty user id"));
        }

        match &self.identity {
            Identity::Unauthenticated => {
                self.identity = Identity::Authenticated { uid };
                Ok(())
            }
            Identity::Authenticated { uid: current } if *current == uid => Ok(()),
            Identity::Authenticated { uid: current } => Err(protocol_error(format!(
                "identity lookup returned '{}' but session is bound to '{}'",
                uid, current
            ))),
        }
    }

    pub fn address(&self) -> Option<&Address> {
        self.address.as_ref()
    }

    pub fn set_address(&mut self, address: Address) {
        self.address = Some(address);
    }

    pub fn timestamp(&self) -> String {
        self.clock.unix_timestamp()
    }
}
