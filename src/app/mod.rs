//! Binary-side composition: config, terminal setup, step reporting.

pub(crate) mod config;
pub(crate) mod progress;
pub(crate) mod runtime;
pub(crate) mod terminal;
pub(crate) mod validation;
