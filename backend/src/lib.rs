//! File Share Backend service
//!
//! Issues short-lived signed URLs so browsers can upload files straight to
//! blob storage and share a time-limited download link.

#![deny(clippy::all, clippy::pedantic, clippy::nursery, dead_code)]
#![allow(clippy::missing_errors_doc, clippy::module_name_repetitions)]

pub mod middleware;
pub mod policy;
pub mod rate_limit;
pub mod routes;
pub mod server;
pub mod storage;
pub mod types;
