//! User credentials for the session gateway
//!
//! Two seams the gateway consumes:
//! - `PasswordHasher`: one-way hashing + constant-time verification (bcrypt)
//! - `UserStore`: lookup by username and atomic registration (in-memory)
//!
//! Both are object-safe so the service holds them as `Arc<dyn ...>` and a
//! persistent datastore can replace the in-memory store without touching
//! handlers.

pub mod error;
pub mod hasher;
pub mod store;

pub use error::{Error, Result};
pub use hasher::{BCRYPT_COST, BcryptHasher, PasswordHasher, looks_like_bcrypt};
pub use store::{MemoryUserStore, NewUser, UserRecord, UserStore};
