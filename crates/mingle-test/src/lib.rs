//! Mingle event server - integration test support.
//!
//! This crate re-exports the workspace crates to support integration tests
//! that use `mingle::` paths.

#![allow(ambiguous_glob_reexports)]

pub mod component {
    // Re-export core and service modules at the component level
    pub use mingle_core::*;
    pub use mingle_service::*;

    // Re-export db crate with all its public modules
    pub mod db {
        pub use mingle_db::db::*;

        // Additional db handlers from app
        pub mod connection {
            pub use mingle_app::db_handler::DbProviderHandler;
            pub use mingle_db::db::connection::*;
        }
    }

    // Re-export models
    pub mod model {
        pub use mingle_db::model::*;
    }

    // Re-export app middleware and handlers
    pub mod middleware {
        pub use mingle_app::middleware::*;
    }

    // Re-export config from core
    pub mod config {
        pub use mingle_core::config::*;
    }
}

// Re-export top-level modules for convenience
pub mod app {
    pub use mingle_app::*;

    pub mod api {
        pub use mingle_app::app::api::*;
    }
}
