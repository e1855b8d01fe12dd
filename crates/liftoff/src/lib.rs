//! Deploy a containerized HTTP service to Google Cloud Run.
//!
//! This crate is the deploy pipeline. It takes a resolved
//! [`DeploymentConfig`](liftoff_core::DeploymentConfig) and drives the
//! platform through [`GcloudClient`](liftoff_cloud::GcloudClient):
//!
//! ```text
//! select image ─┬─ full:   image_at(TAG)
//!               └─ deploy: TAG pinned, or the image the service runs now
//! render descriptor
//! enable APIs → artifact repository → secret (+ accessor grant)
//! build (full only) → services replace → invoke access → URL + checks
//! ```
//!
//! Progress goes through a [`Reporter`]; failures carry an [`ErrorClass`]
//! that maps to the process exit code.
//!
//! ```rust,no_run
//! use liftoff::{ConsoleReporter, deploy};
//! use liftoff_cloud::GcloudClient;
//! use liftoff_core::{DeploymentConfig, Overrides};
//!
//! # async fn run() -> Result<(), liftoff::Error> {
//! let inputs = Overrides::from_pairs([("PROJECT_ID", "acme-prod")]);
//! let config = DeploymentConfig::resolve(&inputs, liftoff_core::revision::probe)?;
//! let outcome = deploy(&GcloudClient::new(), &config, &mut ConsoleReporter).await?;
//! println!("{}", outcome.url);
//! # Ok(())
//! # }
//! ```

pub mod access;
pub mod error;
pub mod pipeline;
pub mod reporter;
pub mod verify;

pub use access::AccessDecision;
pub use error::{Error, ErrorClass};
pub use pipeline::{DeployOutcome, deploy, render_descriptor};
pub use reporter::{ConsoleReporter, Reporter};
pub use verify::VerifyCommand;
