//! HTTP request handlers.

pub mod files;
pub mod upload;
