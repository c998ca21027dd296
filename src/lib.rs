//! postconf-rs: safe concurrent administration of Postfix configuration
//!
//! Wraps the external `postconf` tool to read and write the key/value store
//! (`main.cf`) and the master service table (`master.cf`) safely while web
//! requests, background jobs and CLI invocations operate on the same files
//! from separate processes.
//!
//! # Features
//!
//! - **Validation**: keys and values are checked before they ever reach a
//!   process invocation
//! - **Locking**: one named, cross-process lock serializes every compound
//!   operation
//! - **Diagnosis & repair**: declared baselines are diffed against the live
//!   configuration; drift produces advice that is applied only on request
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use postconf_rs::audit;
//! use postconf_rs::lock::LockRegistry;
//! use postconf_rs::postconf::{ConfigStore, PostconfRunner};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let runner = Arc::new(PostconfRunner::new(
//!         "/sbin/postconf",
//!         Duration::from_secs(10),
//!     ));
//!     let locks = Arc::new(LockRegistry::new("/run/lock/postconf-rs"));
//!     let store = ConfigStore::new(runner, locks);
//!
//!     let diagnosis = audit::submission::check(&store).await;
//!     if diagnosis.has_failed() {
//!         audit::repair(&store, &diagnosis).await?;
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! - [`config`]: Configuration management
//! - [`error`]: Error types and handling
//! - [`validate`]: Key/value validation
//! - [`lock`]: Named cross-process locks
//! - [`postconf`]: The config store wrapping the external tool
//! - [`audit`]: Drift detection and repair

pub mod audit;
pub mod config;
pub mod error;
pub mod lock;
pub mod postconf;
pub mod validate;

// Re-export commonly used types
pub use config::Config;
pub use error::{ConfError, Result};
