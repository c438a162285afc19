//! PlayHub - backend for a gaming lobby directory
//!
//! This library provides the storage, listing and resource services behind
//! the PlayHub HTTP API.

pub mod api;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
