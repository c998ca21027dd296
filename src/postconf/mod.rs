//! Thread- and process-safe wrapper around the `postconf` tool.
//!
//! Every public operation validates its inputs, acquires the shared
//! configuration lock once, and performs all tool invocations inside that
//! single critical section. The unlocked primitives are private and take a
//! [`LockGuard`](crate::lock::LockGuard) witness, so they cannot be reached
//! without the lock held.

pub mod master;
pub mod runner;

pub use master::ServiceEntry;
pub use runner::{PostconfRunner, ToolRunner};

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use crate::error::{ConfError, Result};
use crate::lock::{LockGuard, LockRegistry};
use crate::validate::{validate_key, validate_value};

/// Name of the lock that serializes all Postfix configuration access.
pub const POSTCONF_LOCK: &str = "email-postconf";

/// Split a raw value into its comma/whitespace separated tokens.
///
/// Empty tokens are dropped, order and duplicates are kept. Brace-delimited
/// lookup-table syntax is not understood here and is rejected outright
/// rather than mis-parsed.
pub fn parse_token_list(raw_value: &str) -> Result<Vec<String>> {
    if raw_value.contains('{') || raw_value.contains('}') {
        return Err(ConfError::UnsupportedFormat(
            "lookup-table syntax in value".to_string(),
        ));
    }

    Ok(raw_value
        .split(',')
        .flat_map(str::split_whitespace)
        .map(str::to_string)
        .collect())
}

/// Wraps invocation of the external tool to get and set configuration keys
/// and to rewrite master service table rows.
pub struct ConfigStore {
    runner: Arc<dyn ToolRunner>,
    locks: Arc<LockRegistry>,
}

impl ConfigStore {
    pub fn new(runner: Arc<dyn ToolRunner>, locks: Arc<LockRegistry>) -> Self {
        ConfigStore { runner, locks }
    }

    /// Get a single configuration value.
    pub async fn get(&self, key: &str) -> Result<String> {
        validate_key(key)?;
        let guard = self.locks.acquire_all(POSTCONF_LOCK).await?;
        self.get_unlocked(&guard, key).await
    }

    /// Get several values under one lock acquisition, returned in the key
    /// order supplied. The single critical section is what makes the result
    /// a consistent snapshot: a concurrent writer cannot slip in between two
    /// of the individual reads.
    pub async fn get_many(&self, keys: &[&str]) -> Result<Vec<(String, String)>> {
        for key in keys {
            validate_key(key)?;
        }

        let guard = self.locks.acquire_all(POSTCONF_LOCK).await?;
        let mut result = Vec::with_capacity(keys.len());
        for key in keys {
            let value = self.get_unlocked(&guard, key).await?;
            result.push((key.to_string(), value));
        }
        Ok(result)
    }

    /// Get a value and parse it as a token list.
    pub async fn get_token_list(&self, key: &str) -> Result<Vec<String>> {
        parse_token_list(&self.get(key).await?)
    }

    /// Set several values under one lock acquisition.
    ///
    /// Every pair is validated before any mutation. The external tool has no
    /// multi-key transaction, so a failure mid-batch leaves earlier keys
    /// applied and is surfaced as a hard error naming the failing key; no
    /// rollback is attempted.
    pub async fn set_many(&self, kv_map: &BTreeMap<String, String>) -> Result<()> {
        for (key, value) in kv_map {
            validate_key(key)?;
            validate_value(value)?;
        }

        let guard = self.locks.acquire_all(POSTCONF_LOCK).await?;
        for (key, value) in kv_map {
            self.set_unlocked(&guard, key, value).await?;
        }
        Ok(())
    }

    /// Rewrite a whole master service table row, then apply each option as a
    /// per-field override. Both happen in the same critical section so no
    /// reader can observe a half-updated row.
    pub async fn set_service_entry(
        &self,
        entry: &ServiceEntry,
        options: &BTreeMap<String, String>,
    ) -> Result<()> {
        for (key, value) in options {
            validate_key(key)?;
            validate_value(value)?;
        }

        let target = entry.target();
        let row = entry.serialize();

        let guard = self.locks.acquire_all(POSTCONF_LOCK).await?;
        self.run_unlocked(&guard, vec!["-M".to_string(), format!("{}={}", target, row)])
            .await?;
        for (key, value) in options {
            self.run_unlocked(
                &guard,
                vec!["-P".to_string(), format!("{}/{}={}", target, key, value)],
            )
            .await?;
        }
        Ok(())
    }

    /// Read one key inside an already-held critical section.
    async fn get_unlocked(&self, _guard: &LockGuard, key: &str) -> Result<String> {
        let args = vec![key.to_string()];
        let output = self.runner.run(&args).await?;
        let prefix = format!("{} =", key);
        match output.strip_prefix(&prefix) {
            Some(rest) => Ok(rest.trim().to_string()),
            None => Err(ConfError::KeyNotFound(key.to_string())),
        }
    }

    /// Write one key inside an already-held critical section.
    async fn set_unlocked(&self, guard: &LockGuard, key: &str, value: &str) -> Result<()> {
        debug!(key, "setting postconf value");
        match self.run_unlocked(guard, vec![format!("{}={}", key, value)]).await {
            Ok(_) => Ok(()),
            Err(ConfError::ExternalTool(message)) => Err(ConfError::ExternalTool(format!(
                "key '{}': {}",
                key, message
            ))),
            Err(error) => Err(error),
        }
    }

    async fn run_unlocked(&self, _guard: &LockGuard, args: Vec<String>) -> Result<String> {
        self.runner.run(&args).await
    }
}
