pub mod app;
pub mod codes;
pub mod config;
pub mod credentials;
pub mod delay;
pub mod domain;
pub mod error;
pub mod locator;
pub mod output;
pub mod retry;
pub mod store;
