//! # API Route Modules
//!
//! - `assets`: upload, read and existence probe for content-addressed
//!   assets, mounted at the root (`/{filename}`, `/file_exists/{filename}`).

pub mod assets;
