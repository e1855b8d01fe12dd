//! Core types and configuration for liftoff.
//!
//! This crate resolves layered key/value input ([`Overrides`]) into a
//! validated [`DeploymentConfig`], and defines image coordinates
//! ([`ImageReference`]), source revision probing, and shared error types.

pub mod config;
pub mod error;
pub mod image;
pub mod overrides;
pub mod revision;
pub mod secret_scan;

pub use config::{DeploymentConfig, Endpoints, Ingress, Mode, SecretRef, TagSource};
pub use error::{Error, Result};
pub use image::ImageReference;
pub use overrides::{CONFIG_FILE, Overrides, RECOGNIZED_KEYS};
pub use revision::{FALLBACK_TAG, SourceRevision};
pub use secret_scan::{ensure_not_secret, looks_like_secret};
