//! Report output
//!
//! Renders a [`RunReport`](crate::coordinator::RunReport) as a human-readable
//! summary or as JSON.

pub mod json;
pub mod text;
