//! Authentication flow.
//!
//! ## Module Organization
//!
//! - `authenticate`: HTTP Basic credential checking against stored users
//! - `depot`: Helpers for the per-request principal stored in the Salvo depot
//! - `password`: Password hashing and verification with Argon2

pub mod authenticate;
pub mod depot;
pub mod password;

// Re-export commonly used types at module level
pub use authenticate::authenticate;
pub use depot::{CurrentUser, get_user_from_depot, is_authenticated};
pub use password::{hash_password, verify_password};
