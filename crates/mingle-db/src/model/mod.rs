pub mod category;
pub mod event;
pub mod friendship;
pub mod participant;
pub mod user;
