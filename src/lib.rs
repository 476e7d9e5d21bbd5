// The binary is a thin shell over this library; integration tests drive it directly.
pub mod cli;
pub mod commands;
pub mod config;
pub mod corpus;
pub mod error;
pub mod logging;
pub mod state;
