//! Command handlers

pub mod config;
pub mod edit;
pub mod status;
pub mod will;
