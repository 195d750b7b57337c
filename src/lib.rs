/// Basic application code
pub mod app;
/// Application authentication and authorization
pub mod auth;
/// REST clients for outside services
pub mod client;
/// Controllers for REST endpoints
pub mod controller;
/// Cryptography-related objects
pub mod crypto;
/// Domain objects
pub mod domain;
/// Error enums
pub mod error;
/// Database records
pub mod model;
/// Repositories
pub mod repo;
/// Application settings
pub mod settings;
/// Storage for uploaded files
pub mod storage;
/// Application telemetry for tracing and logging
pub mod telemetry;
