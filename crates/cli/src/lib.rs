//! Public library modules for the CLI crate
pub mod env;
pub mod summary;
