//! # Catalog Sync Library
//!
//! Imports games from the external game database into the storefront
//! catalog and keeps imported products in sync: token management, the query
//! client, metadata mapping, import orchestration, the daily scheduler and
//! the administrative HTTP surface.

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod igdb;
pub mod import;
pub mod mapper;
pub mod models;
pub mod repositories;
pub mod scheduler;
pub mod seeds;
pub mod server;
pub mod telemetry;
pub use migration;
