//! Client-side session management.
//!
//! The session holds the bearer token and user identity that govern which
//! backend calls succeed. It is:
//!
//! - **Restored** once at start-up from durable storage
//! - **Written** on every login and logout
//! - **Torn down** by the gateway's session interceptor on any 401
//!
//! ## Usage
//!
//! ```ignore
//! let storage = Arc::new(FileStorage::new(&config.session_file));
//! let store = SessionStore::restore(storage);
//!
//! if let Some(session) = store.current().await {
//!     println!("Signed in as {}", session.display());
//! }
//! ```

mod context;
pub mod storage;
mod store;
pub mod token;

pub use context::{AuthUser, Session, SessionState};
pub use storage::{FileStorage, MemoryStorage, SessionStorage, StorageError};
pub use store::{Credentials, SessionStore};
