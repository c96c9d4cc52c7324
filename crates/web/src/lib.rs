//! Stockroom web application library.
//!
//! A small authenticated inventory: users register and log in, then list,
//! add and rename items. The binary in `main.rs` wires this library to
//! `PostgreSQL`, Sentry and a TCP listener; tests drive [`app::build_app`]
//! directly with memory stores.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod app;
pub mod config;
pub mod db;
pub mod error;
pub mod filters;
pub mod flash;
pub mod forms;
pub mod middleware;
pub mod models;
pub mod redirect;
pub mod routes;
pub mod services;
pub mod state;
