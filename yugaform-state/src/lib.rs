//! Yugaform State Management
//!
//! Records what yugaform manages on the platform: one entry per declared
//! resource with its platform identifier and last known attributes. State is
//! kept in a local JSON file guarded by a lock file so two runs never
//! reconcile the same resources at once.
//!
//! # Example
//!
//! ```ignore
//! use yugaform_state::{create_backend, BackendConfig, Operation};
//!
//! let backend = create_backend(&config)?;
//!
//! let lock = backend.acquire_lock(Operation::Apply).await?;
//! let mut state = backend.read_state().await?.unwrap_or_default();
//!
//! // ... apply effects, recording each result ...
//!
//! state.increment_serial();
//! backend.write_state(&state).await?;
//! backend.release_lock(&lock).await?;
//! ```

pub mod backend;
pub mod backends;
pub mod lock;
pub mod state;

pub use backend::{BackendConfig, BackendError, BackendResult, StateBackend};
pub use backends::{LocalBackend, create_backend};
pub use lock::{LockInfo, Operation};
pub use state::{ResourceState, StateFile};
