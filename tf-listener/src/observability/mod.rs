//! Structured observability vocabulary shared by the listener modules.

pub mod events;
pub mod fields;
