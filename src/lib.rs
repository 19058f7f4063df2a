//! Articlebox - a small article API with caller-supplied query filters
//!
//! This library provides the storage layer, the filter language, the route
//! policies and the HTTP router. The `articlebox` binary wires them together.

pub mod api;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
