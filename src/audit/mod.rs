//! Drift detection and reconciliation for the Postfix configuration.
//!
//! Each audit reads the current values of a declared baseline under one lock
//! acquisition, diffs them, and returns a [`Diagnosis`] whose advice is the
//! minimal delta restoring the baseline. Applying the advice is a separate
//! locked step that only runs when explicitly requested: observation and
//! repair deliberately do not share a critical section, because a human may
//! confirm in between. The window where another process changes the
//! configuration is accepted and resolved by re-running the audit after
//! repair rather than by holding one giant lock across both phases.

pub mod domain;
pub mod models;
pub mod spam;
pub mod submission;

pub use models::{Diagnosis, DiagnosisStatus};

use std::collections::BTreeMap;

use tracing::{info, warn};

use crate::error::Result;
use crate::postconf::ConfigStore;

/// Observe the current values of every baseline key (one locked read) and
/// diff them against the baseline.
///
/// Errors during observation do not propagate; they evaluate the diagnosis
/// to critical so surfaces can report "could not verify" instead of showing
/// stale or guessed advice.
pub async fn run_audit(
    store: &ConfigStore,
    title: &str,
    baseline: &BTreeMap<String, String>,
) -> Diagnosis {
    let mut diagnosis = Diagnosis::new(title);
    let keys: Vec<&str> = baseline.keys().map(String::as_str).collect();

    match store.get_many(&keys).await {
        Ok(current) => diagnosis.compare_and_advise(&current, baseline),
        Err(error) => {
            warn!(title, %error, "audit observation failed");
            diagnosis.critical(error.to_string());
            diagnosis.critical("check the journal for more information");
        }
    }

    diagnosis
}

/// Apply a diagnosis' advice under one lock acquisition.
///
/// Fails with `NotRepairable` (and performs no external calls) unless the
/// diagnosis found drift and carries advice.
pub async fn repair(store: &ConfigStore, diagnosis: &Diagnosis) -> Result<()> {
    diagnosis.assert_resolvable()?;
    info!(title = %diagnosis.title, advice = ?diagnosis.advice, "applying advice");
    store.set_many(&diagnosis.advice).await
}
