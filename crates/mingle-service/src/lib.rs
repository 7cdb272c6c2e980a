//! Domain logic for mingle: the recurrence engine, the friendship state
//! machine, and the transactional services behind users, events, categories,
//! and participation.

pub mod auth;
pub mod category;
pub mod error;
pub mod event;
pub mod friendship;
pub mod participant;
pub mod recurrence;
pub mod user;
