//! Local environment bootstrapper for the actions runtime

pub mod bootstrap;
pub mod commands;
pub mod config;
