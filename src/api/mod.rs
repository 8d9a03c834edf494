//! API Module
//! Mission: Typed HTTP access to the opportunity console backend

pub mod client;

pub use client::{ApiClient, UserRecord};
