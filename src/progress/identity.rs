//! Identity resolution for the student and teacher key namespaces.
//!
//! A resolver answers "whose namespace is this?" with the following chain:
//!
//! 1. the progress-owning session, when it holds a loaded identity of the
//!    resolver's role;
//! 2. the auth collaborator's current user id, provided the stored role flag
//!    (unscoped `"UserRole"`, missing means student) matches the resolver's role;
//! 3. the sentinel identity (`"DefaultStudent"` / `"DefaultTeacher"`).
//!
//! Resolution never performs IO beyond reading the role flag and never
//! mutates anything, so it is safe to call before login has completed.
//! Student and teacher resolvers are intentionally separate: a teacher can be
//! previewing content while a stale student session is still around.

use std::sync::Arc;

use log::debug;

use crate::progress::errors::ProgressError;
use crate::progress::kv::KeyValueStore;
use crate::progress::types::{Identity, Role, ROLE_FLAG_KEY};

/// Unscoped key holding the id of the last authenticated user.
pub const CURRENT_USER_KEY: &str = "CurrentUserId";

/// Implemented by whatever owns the loaded progress for an identity.
pub trait LoadedIdentity: Send + Sync {
    fn loaded_identity(&self) -> Option<Identity>;
}

/// Lower-level session/auth collaborator.
pub trait AuthSession: Send + Sync {
    fn current_user_id(&self) -> Option<String>;
}

/// Auth collaborator backed by the unscoped key-value store: the login flow
/// records the user id and role flag, and they persist across restarts.
pub struct StoredAuthSession {
    store: Arc<dyn KeyValueStore>,
}

impl StoredAuthSession {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Remember `identity` as the authenticated user.
    pub fn record_login(&self, identity: &Identity) -> Result<(), ProgressError> {
        self.store.set_string(CURRENT_USER_KEY, &identity.id)?;
        self.store.set_string(ROLE_FLAG_KEY, identity.role.as_str())?;
        self.store.save()
    }

    /// Forget the authenticated user. The role flag is left for the next login to overwrite.
    pub fn clear(&self) -> Result<(), ProgressError> {
        self.store.delete_key(CURRENT_USER_KEY)?;
        self.store.save()
    }
}

impl AuthSession for StoredAuthSession {
    fn current_user_id(&self) -> Option<String> {
        match self.store.get_string(CURRENT_USER_KEY, "") {
            Ok(id) if !id.is_empty() => Some(id),
            Ok(_) => None,
            Err(e) => {
                debug!("current user lookup failed: {}", e);
                None
            }
        }
    }
}

#[derive(Clone)]
pub struct IdentityResolver {
    role: Role,
    holder: Option<Arc<dyn LoadedIdentity>>,
    auth: Option<Arc<dyn AuthSession>>,
    flags: Option<Arc<dyn KeyValueStore>>,
}

impl IdentityResolver {
    pub fn new(role: Role) -> Self {
        Self {
            role,
            holder: None,
            auth: None,
            flags: None,
        }
    }

    pub fn student() -> Self {
        Self::new(Role::Student)
    }

    pub fn teacher() -> Self {
        Self::new(Role::Teacher)
    }

    pub fn with_session(mut self, holder: Arc<dyn LoadedIdentity>) -> Self {
        self.holder = Some(holder);
        self
    }

    /// `flags` is the unscoped store carrying the role flag.
    pub fn with_auth(mut self, auth: Arc<dyn AuthSession>, flags: Arc<dyn KeyValueStore>) -> Self {
        self.auth = Some(auth);
        self.flags = Some(flags);
        self
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn current_identity(&self) -> Identity {
        if let Some(identity) = self.from_session() {
            return identity;
        }
        if let Some(identity) = self.from_auth() {
            return identity;
        }
        Identity::sentinel(self.role)
    }

    fn from_session(&self) -> Option<Identity> {
        let identity = self.holder.as_ref()?.loaded_identity()?;
        if identity.id.is_empty() || identity.role != self.role {
            return None;
        }
        Some(identity)
    }

    fn from_auth(&self) -> Option<Identity> {
        let id = self.auth.as_ref()?.current_user_id()?;
        if id.is_empty() {
            return None;
        }
        let role = self.stored_role();
        if role != self.role {
            return None;
        }
        Some(Identity::new(&id, role))
    }

    fn stored_role(&self) -> Role {
        let Some(flags) = self.flags.as_ref() else {
            return Role::Student;
        };
        flags
            .get_string(ROLE_FLAG_KEY, "")
            .ok()
            .and_then(|value| Role::parse(&value))
            .unwrap_or(Role::Student)
    }
}
