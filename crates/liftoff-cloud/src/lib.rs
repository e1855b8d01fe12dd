//! Google Cloud operations for liftoff, driven through the `gcloud` CLI.
//!
//! [`GcloudClient`] wraps one [`GcloudExecutor`]; every method issues a
//! single blocking platform call (or a short fixed sequence) and maps
//! failures into a per-area error enum. Creation calls distinguish the
//! platform's "already exists" answer from real failures via
//! [`GcloudError::is_already_exists`].

pub mod client;
pub mod executor;
pub mod gcloud;

pub use client::{
    ApiCheck, ArtifactError, CheckResult, CloudBuildError, DeployError, DoctorReport,
    DoctorTarget, GcloudClient, IamError, REQUIRED_SERVICES, SecretError, ServicesError,
};
pub use executor::{GcloudExecutor, RealExecutor};
pub use gcloud::GcloudError;
