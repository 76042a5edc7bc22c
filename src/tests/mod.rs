//! Crate-level tests over the in-memory backend
