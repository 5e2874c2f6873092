pub mod app;
pub mod config;
pub mod domain;
pub mod error;
pub mod fetch;
pub mod lakefs;
pub mod output;
pub mod staging;
pub mod sync;
