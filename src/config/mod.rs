//! Configuration management for portsweep.
//!
//! Provides XDG-compliant lookup of the optional settings file.

mod settings;

pub use settings::{AppSettings, Paths};
