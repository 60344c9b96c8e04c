#![forbid(unsafe_code)]

//! Remote command server for STEM ptychography instrument hosts.
//!
//! A central controller drives the microscope host and the camera host over
//! a line-oriented TCP protocol. Each host runs the same [`server::Server`],
//! configured with its role and a closed [`registry::Registry`] of commands
//! backed by an [`instrument::Instrument`] facade.

pub mod config;
pub mod errors;
pub mod instrument;
pub mod profile;
pub mod protocol;
pub mod registry;
pub mod server;

pub use config::ServerConfig;
pub use errors::{AppError, Result};
