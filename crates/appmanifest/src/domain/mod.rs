//! Manifest documents, YAML trees, and the values produced from them.

pub mod document;
pub mod errors;
pub mod model;
pub mod yaml;
