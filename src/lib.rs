pub mod api;
pub mod codes;
pub mod config;
pub mod engine;
pub mod error;
pub mod models;
pub mod observability;
pub mod pix;
pub mod state;
