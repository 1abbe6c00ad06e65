use std::{
    collections::{BTreeMap, HashMap},
    fmt, fs,
    path::{Path, PathBuf},
    str::FromStr,
    sync::{Arc, RwLock},
};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Identity, IdentityDraft, Role};

// Keys of the three identity fields inside a session record.
pub const ROLE_KEY: &str = "role";
pub const DISPLAY_NAME_KEY: &str = "display_name";
pub const USER_ID_KEY: &str = "user_id";
/// RFC 3339 instant after which the record no longer counts as an identity.
pub const EXPIRES_AT_KEY: &str = "expires_at";

/// Lifetime of a session when no other value is configured.
pub const DEFAULT_SESSION_TTL_SECS: i64 = 8 * 60 * 60;

/// SessionId
///
/// Opaque browser-session key, carried in the `x-session-id` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for SessionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(SessionId)
    }
}

/// Raw string fields of one session, exactly as the store holds them.
pub type SessionFields = BTreeMap<String, String>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("identity store lock poisoned")]
    Poisoned,
    #[error("identity store io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("identity store is not valid json: {0}")]
    Serde(#[from] serde_json::Error),
}

/// IdentityStore
///
/// The durable local key-value store behind the session context. Implementations must
/// make `replace` and `remove` atomic per session: a reader sees either the old record or
/// the new one, never a mix.
pub trait IdentityStore: Send + Sync {
    fn load(&self, session: SessionId) -> Result<Option<SessionFields>, StoreError>;
    fn replace(&self, session: SessionId, fields: SessionFields) -> Result<(), StoreError>;
    fn remove(&self, session: SessionId) -> Result<(), StoreError>;
}

/// MemoryIdentityStore
///
/// Process-resident store. Sessions vanish on restart.
#[derive(Default)]
pub struct MemoryIdentityStore {
    sessions: RwLock<HashMap<SessionId, SessionFields>>,
}

impl MemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdentityStore for MemoryIdentityStore {
    fn load(&self, session: SessionId) -> Result<Option<SessionFields>, StoreError> {
        let sessions = self.sessions.read().map_err(|_| StoreError::Poisoned)?;
        Ok(sessions.get(&session).cloned())
    }

    fn replace(&self, session: SessionId, fields: SessionFields) -> Result<(), StoreError> {
        let mut sessions = self.sessions.write().map_err(|_| StoreError::Poisoned)?;
        sessions.insert(session, fields);
        Ok(())
    }

    fn remove(&self, session: SessionId) -> Result<(), StoreError> {
        let mut sessions = self.sessions.write().map_err(|_| StoreError::Poisoned)?;
        sessions.remove(&session);
        Ok(())
    }
}

/// FileIdentityStore
///
/// JSON-file backed store so sessions survive a restart. The whole map is rewritten into
/// a sibling temp file and renamed over the original, which keeps every write atomic on
/// the filesystem as well as in memory.
pub struct FileIdentityStore {
    path: PathBuf,
    sessions: RwLock<HashMap<SessionId, SessionFields>>,
}

impl FileIdentityStore {
    /// open
    ///
    /// Loads an existing store file, or starts empty if the file does not exist yet.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let sessions = match fs::read(&path) {
            Ok(bytes) if bytes.is_empty() => HashMap::new(),
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(e.into()),
        };
        tracing::debug!(path = %path.display(), sessions = sessions.len(), "identity store opened");
        Ok(Self {
            path,
            sessions: RwLock::new(sessions),
        })
    }

    fn persist(&self, sessions: &HashMap<SessionId, SessionFields>) -> Result<(), StoreError> {
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, serde_json::to_vec(sessions)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl IdentityStore for FileIdentityStore {
    fn load(&self, session: SessionId) -> Result<Option<SessionFields>, StoreError> {
        let sessions = self.sessions.read().map_err(|_| StoreError::Poisoned)?;
        Ok(sessions.get(&session).cloned())
    }

    fn replace(&self, session: SessionId, fields: SessionFields) -> Result<(), StoreError> {
        let mut sessions = self.sessions.write().map_err(|_| StoreError::Poisoned)?;
        let mut next = sessions.clone();
        next.insert(session, fields);
        // Disk first: memory only changes once the new file is in place.
        self.persist(&next)?;
        *sessions = next;
        Ok(())
    }

    fn remove(&self, session: SessionId) -> Result<(), StoreError> {
        let mut sessions = self.sessions.write().map_err(|_| StoreError::Poisoned)?;
        if !sessions.contains_key(&session) {
            return Ok(());
        }
        let mut next = sessions.clone();
        next.remove(&session);
        self.persist(&next)?;
        *sessions = next;
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("identity field `{0}` is missing")]
    MissingField(&'static str),
    #[error("session expiry is not an RFC 3339 timestamp")]
    InvalidExpiry,
    #[error(transparent)]
    UnknownRole(#[from] crate::models::UnknownRole),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// SessionContext
///
/// Single-writer, many-reader access to the current identity of each session. Injected
/// through `AppState`, so tests can hand in any `IdentityStore`.
#[derive(Clone)]
pub struct SessionContext {
    store: Arc<dyn IdentityStore>,
    ttl: Duration,
}

impl SessionContext {
    pub fn new(store: Arc<dyn IdentityStore>) -> Self {
        Self {
            store,
            ttl: Duration::seconds(DEFAULT_SESSION_TTL_SECS),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryIdentityStore::new()))
    }

    /// Sets how long an identity stays valid after `set_identity`.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// get_identity
    ///
    /// Reads the session record and rebuilds the identity. Anything short of three
    /// non-empty fields with a known role and a readable expiry reads as "absent". An
    /// expired record is removed from the store on the way.
    pub fn get_identity(&self, session: SessionId) -> Option<Identity> {
        let fields = match self.store.load(session) {
            Ok(Some(fields)) => fields,
            Ok(None) => return None,
            Err(e) => {
                tracing::error!(%session, "identity store read failed: {e}");
                return None;
            }
        };
        match identity_from_fields(&fields) {
            Ok((identity, expires_at)) if expires_at > Utc::now() => Some(identity),
            Ok(_) => {
                tracing::info!(%session, "session expired");
                if let Err(e) = self.store.remove(session) {
                    tracing::error!(%session, "could not remove expired session: {e}");
                }
                None
            }
            Err(e) => {
                tracing::warn!(%session, "discarding malformed session identity: {e}");
                None
            }
        }
    }

    /// set_identity
    ///
    /// Validates the draft completely before touching the store, then writes all
    /// identity fields and the expiry in one `replace`. The expiry is the configured
    /// lifetime from now, cut short by the draft's own `expires_at` if that comes first.
    /// On error nothing is written.
    pub fn set_identity(
        &self,
        session: SessionId,
        draft: IdentityDraft,
    ) -> Result<Identity, SessionError> {
        let id = required(draft.id, USER_ID_KEY)?;
        let display_name = required(draft.display_name, DISPLAY_NAME_KEY)?;
        let role: Role = required(draft.role, ROLE_KEY)?.parse()?;

        let lifetime_end = Utc::now() + self.ttl;
        let expires_at = draft
            .expires_at
            .map_or(lifetime_end, |limit| limit.min(lifetime_end));

        let identity = Identity {
            id,
            role,
            display_name,
        };
        self.store
            .replace(session, identity_to_fields(&identity, expires_at))?;
        tracing::info!(%session, role = %identity.role, %expires_at, "identity established");
        Ok(identity)
    }

    pub fn clear_identity(&self, session: SessionId) -> Result<(), SessionError> {
        self.store.remove(session)?;
        tracing::info!(%session, "identity cleared");
        Ok(())
    }
}

fn required(value: Option<String>, key: &'static str) -> Result<String, SessionError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(SessionError::MissingField(key)),
    }
}

fn identity_from_fields(
    fields: &SessionFields,
) -> Result<(Identity, DateTime<Utc>), SessionError> {
    let field = |key: &'static str| required(fields.get(key).cloned(), key);
    let expires_at = DateTime::parse_from_rfc3339(&field(EXPIRES_AT_KEY)?)
        .map_err(|_| SessionError::InvalidExpiry)?
        .with_timezone(&Utc);
    let identity = Identity {
        id: field(USER_ID_KEY)?,
        role: field(ROLE_KEY)?.parse()?,
        display_name: field(DISPLAY_NAME_KEY)?,
    };
    Ok((identity, expires_at))
}

fn identity_to_fields(identity: &Identity, expires_at: DateTime<Utc>) -> SessionFields {
    SessionFields::from([
        (USER_ID_KEY.to_string(), identity.id.clone()),
        (ROLE_KEY.to_string(), identity.role.as_str().to_string()),
        (DISPLAY_NAME_KEY.to_string(), identity.display_name.clone()),
        (EXPIRES_AT_KEY.to_string(), expires_at.to_rfc3339()),
    ])
}
