//! # Repository Layer
//!
//! Persistence for the imported catalog: products, their media and origin
//! links, and the platform and genre reference tables.

pub mod catalog;

pub use catalog::{CatalogStore, CommercialFields, ProductDetails, ProductGraph, SeaOrmCatalogStore};
