//! Core trait abstractions: the language model and the external store.

pub mod model;
pub mod store;
