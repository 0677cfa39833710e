//! Domain types for the fragment extraction pipeline.

pub mod config;
pub mod element;
pub mod fragment;
pub mod outcome;
