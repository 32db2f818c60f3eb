//! Keypecker Common Library
//!
//! This crate provides the value types, constants and configuration loading
//! shared by every crate in the Keypecker workspace.
//!
//! # Module Structure
//!
//! - [`consts`] - System-wide numeric limits
//! - [`actuator`] - Positions, speeds and move results
//! - [`capture`] - Capture directions, channel configuration and results
//! - [`sample`] - Sampling result codes
//! - [`config`] - Configuration loading traits and types
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use kp_common::prelude::*;
//!
//! let dirs = CaptureDirs::from_keyword("both").unwrap();
//! assert_eq!(dirs, CaptureDirs::BOTH);
//! assert_eq!(dirs.title(), "Both");
//! ```

pub mod actuator;
pub mod capture;
pub mod config;
pub mod consts;
pub mod prelude;
pub mod sample;
