//! Per-identity progress: identity-scoped local cache, the authoritative
//! progress record, the achievement/artifact catalog and the unlock paths
//! that keep the two stores in agreement.

pub mod civilization;
pub mod errors;
pub mod identity;
pub mod kv;
pub mod migration;
pub mod registry;
pub mod remote;
pub mod scoped;
pub mod session;
pub mod types;
pub mod unlock;

pub use civilization::{CivilizationGate, DEFAULT_CIVILIZATIONS};
pub use errors::ProgressError;
pub use identity::{AuthSession, IdentityResolver, LoadedIdentity, StoredAuthSession, CURRENT_USER_KEY};
pub use kv::{KeyValueStore, SledKvStore, StoredValue};
pub use migration::{load_and_migrate, Migratable};
pub use registry::{builtin_definitions, load_definitions_from_json, Registry, RegistryBuilder};
pub use remote::{FileProfileStore, OfflineProfileStore, RemoteProfileStore, DEFAULT_MAX_PROFILE_BYTES};
pub use scoped::{scoped_key, ScopedStore};
pub use session::{ProgressSession, ReadyListener, SessionState};
pub use types::*;
pub use unlock::{UnlockCoordinator, UnlockOptions};
