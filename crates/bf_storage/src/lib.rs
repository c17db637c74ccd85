//! Storage backends for article records. The in-memory backend is always
//! available; SQLite lives behind the `sqlite` feature.

pub mod backends;

pub use backends::*;
