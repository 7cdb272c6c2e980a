//! Shared foundation for the mingle workspace: configuration loading,
//! route constants, and the base error type.

pub mod config;
pub mod constants;
pub mod error;
