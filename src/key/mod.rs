// src/key/mod.rs

//! Key resolution for loosely specified dependency references.

pub mod index;
pub mod resolver;

pub use index::KeyIndex;
pub use resolver::{candidate_keys, file_base_name, find_record};
