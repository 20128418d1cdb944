pub mod app;
pub mod auth;
mod backoff;
pub mod clerk;
pub mod cloudinary;
pub mod config;
pub mod error;
pub mod media;
mod middleware;
pub mod repository;
pub mod routes;
mod shutdown;
pub mod state;
mod tracing;
