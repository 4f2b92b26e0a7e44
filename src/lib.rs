//! trackc — compiler for a small track language: samples, patterns,
//! sections and a mixer graph.

pub mod config;
pub mod dsl;
pub mod pattern;
