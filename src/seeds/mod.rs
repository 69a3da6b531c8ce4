//! Database seeding functionality
//!
//! Platforms are reference data the import pipeline never creates on its
//! own, so the common ones are seeded when the service starts.

pub mod platform;

pub use platform::seed_platforms;
