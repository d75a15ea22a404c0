//! # civprogress - identity-scoped learner progress for civilization lessons
//!
//! civprogress tracks what a learner has unlocked (achievements, artifacts,
//! chapters, stories and civilizations) plus hearts and score. Progress lives
//! in two places that must agree:
//!
//! - a **local key-value cache** ([`progress::kv`]), where every key is
//!   namespaced by the identity it belongs to ([`progress::scoped`]);
//! - an **authoritative progress record** per identity ([`progress::session`]),
//!   synced as a whole document with a remote profile store
//!   ([`progress::remote`]).
//!
//! The [`progress::unlock::UnlockCoordinator`] writes through to both and
//! repairs the cache when it lags behind the record.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use civprogress::progress::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let kv: Arc<dyn KeyValueStore> = Arc::new(SledKvStore::open("data/progress.db")?);
//!     let session = Arc::new(ProgressSession::new(Arc::new(OfflineProfileStore)));
//!     let resolver = IdentityResolver::student().with_session(session.clone());
//!     let coordinator = UnlockCoordinator::new(
//!         Arc::new(Registry::builtin()?),
//!         session.clone(),
//!         ScopedStore::new(kv.clone(), resolver),
//!         kv,
//!     );
//!
//!     session.login(Identity::student("amira42")).await?;
//!     coordinator.on_session_ready();
//!     coordinator.unlock("Scribe");
//!     assert!(coordinator.is_unlocked("AC001"));
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`progress`] - identity resolution, scoped storage, record, catalog, unlocks
//! - [`config`] - TOML configuration and validation
//! - [`validation`] - identity id and profile document checks
//! - [`logutil`] - single-line rendering of untrusted values for logs

pub mod config;
pub mod logutil;
pub mod progress;
pub mod validation;
