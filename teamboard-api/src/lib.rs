//! # Teamboard API Server Library
//!
//! This library provides the HTTP and WebSocket surface of Teamboard.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration management
//! - `error`: Error handling and HTTP response mapping
//! - `extract`: JSON extractor with API-shaped rejections
//! - `middleware`: Gate and security header middleware
//! - `routes`: API route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod routes;
