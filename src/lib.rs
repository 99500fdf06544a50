//! # Photohub
//!
//! A photo storage and serving server, usable both as a standalone binary
//! and as a library.
//!
//! ## Library Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use photohub::config::ServerConfig;
//! use photohub::hub::PhotoHub;
//! use photohub::server::{AppState, create_router};
//!
//! let config = ServerConfig::default();
//! let hub = PhotoHub::open(&config).unwrap();
//! hub.initialize().await.unwrap();
//!
//! let router = create_router(Arc::new(AppState { hub: Arc::new(hub) }));
//! // Serve with axum...
//! ```

pub mod blob;
pub mod config;
pub mod error;
pub mod hub;
pub mod server;
pub mod store;
pub mod types;
