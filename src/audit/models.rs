//! Diagnosis model shared by all audit modules.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::{ConfError, Result};
use crate::postconf::parse_token_list;

/// Outcome of one audit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DiagnosisStatus {
    /// Every observed value matched the baseline.
    Ok,
    /// At least one value drifted; the advice restores the baseline.
    Failed,
    /// The audit itself errored; findings explain, no advice is offered.
    Critical,
}

impl std::fmt::Display for DiagnosisStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiagnosisStatus::Ok => write!(f, "ok"),
            DiagnosisStatus::Failed => write!(f, "failed"),
            DiagnosisStatus::Critical => write!(f, "critical"),
        }
    }
}

/// Result of comparing observed configuration against a declared baseline.
///
/// Created fresh per audit run and consumed once by a repair step. Never
/// reused across the lock boundary separating observation from repair: the
/// configuration may have changed in between, so stale advice is discarded
/// by re-running the audit instead.
#[derive(Debug, Clone, Serialize)]
pub struct Diagnosis {
    pub title: String,
    pub status: DiagnosisStatus,
    pub findings: Vec<String>,
    /// Minimal key -> value delta that restores the baseline.
    pub advice: BTreeMap<String, String>,
    /// Identifier of the repair action a surface may offer for this result.
    pub action: Option<String>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl Diagnosis {
    pub fn new(title: impl Into<String>) -> Self {
        Diagnosis {
            title: title.into(),
            status: DiagnosisStatus::Ok,
            findings: Vec::new(),
            advice: BTreeMap::new(),
            action: None,
            timestamp: chrono::Utc::now(),
        }
    }

    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    /// Compare observed values against the baseline and record the baseline
    /// value as advice for every mismatch. Values that parse as token lists
    /// are compared order-insensitively, so a reordered but equivalent list
    /// still counts as matching.
    pub fn compare_and_advise(
        &mut self,
        current: &[(String, String)],
        baseline: &BTreeMap<String, String>,
    ) {
        for (key, wanted) in baseline {
            let observed = current
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str());

            match observed {
                Some(value) if values_equivalent(value, wanted) => {}
                Some(value) => {
                    self.findings.push(format!(
                        "{} is '{}', expected '{}'",
                        key, value, wanted
                    ));
                    self.advise(key, wanted);
                }
                None => {
                    self.findings.push(format!("{} was not observed", key));
                    self.advise(key, wanted);
                }
            }
        }
    }

    /// Record that the audit itself went wrong. Critical diagnoses carry no
    /// advice and are never auto-repaired.
    pub fn critical(&mut self, finding: impl Into<String>) {
        self.status = DiagnosisStatus::Critical;
        self.findings.push(finding.into());
        self.advice.clear();
    }

    pub fn has_failed(&self) -> bool {
        self.status != DiagnosisStatus::Ok
    }

    /// Fails unless this diagnosis is in a repairable state: drift was found
    /// and there is advice to apply.
    pub fn assert_resolvable(&self) -> Result<()> {
        if self.status != DiagnosisStatus::Failed || self.advice.is_empty() {
            return Err(ConfError::NotRepairable(self.title.clone()));
        }
        Ok(())
    }

    /// Sort key for presenting the most severe results first.
    pub fn sorting_key(&self) -> u8 {
        match self.status {
            DiagnosisStatus::Critical => 0,
            DiagnosisStatus::Failed => 1,
            DiagnosisStatus::Ok => 2,
        }
    }

    fn advise(&mut self, key: &str, value: &str) {
        if self.status == DiagnosisStatus::Ok {
            self.status = DiagnosisStatus::Failed;
        }
        self.advice.insert(key.to_string(), value.to_string());
    }
}

/// Token lists compare as unordered multisets; anything else compares as an
/// exact string.
fn values_equivalent(current: &str, baseline: &str) -> bool {
    match (parse_token_list(current), parse_token_list(baseline)) {
        (Ok(mut a), Ok(mut b)) => {
            a.sort();
            b.sort();
            a == b
        }
        _ => current == baseline,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn baseline() -> BTreeMap<String, String> {
        let mut map = BTreeMap::new();
        map.insert("mydomain".to_string(), "example.com".to_string());
        map.insert(
            "mydestination".to_string(),
            "example.com, localhost".to_string(),
        );
        map
    }

    #[test]
    fn test_matching_configuration_is_ok() {
        let current = vec![
            ("mydomain".to_string(), "example.com".to_string()),
            (
                "mydestination".to_string(),
                // Same tokens, different order and separators.
                "localhost example.com".to_string(),
            ),
        ];

        let mut diagnosis = Diagnosis::new("domains");
        diagnosis.compare_and_advise(&current, &baseline());

        assert_eq!(diagnosis.status, DiagnosisStatus::Ok);
        assert!(diagnosis.advice.is_empty());
        assert!(diagnosis.findings.is_empty());
    }

    #[test]
    fn test_drift_produces_advice() {
        let current = vec![
            ("mydomain".to_string(), "example.com".to_string()),
            ("mydestination".to_string(), "old.example.com".to_string()),
        ];

        let mut diagnosis = Diagnosis::new("domains");
        diagnosis.compare_and_advise(&current, &baseline());

        assert_eq!(diagnosis.status, DiagnosisStatus::Failed);
        assert_eq!(diagnosis.advice.len(), 1);
        assert_eq!(
            diagnosis.advice.get("mydestination").unwrap(),
            "example.com, localhost"
        );
        assert_eq!(diagnosis.findings.len(), 1);
    }

    #[test]
    fn test_lookup_table_values_compare_exactly() {
        let mut baseline = BTreeMap::new();
        baseline.insert("maps".to_string(), "inline:{a=b}".to_string());

        let current = vec![("maps".to_string(), "inline:{a=b}".to_string())];
        let mut diagnosis = Diagnosis::new("maps");
        diagnosis.compare_and_advise(&current, &baseline);
        assert_eq!(diagnosis.status, DiagnosisStatus::Ok);
    }

    #[test]
    fn test_critical_clears_advice() {
        let current = vec![("mydomain".to_string(), "other.org".to_string())];
        let mut diagnosis = Diagnosis::new("domains");
        diagnosis.compare_and_advise(&current, &baseline());
        assert_eq!(diagnosis.status, DiagnosisStatus::Failed);

        diagnosis.critical("postconf invocation failed");
        assert_eq!(diagnosis.status, DiagnosisStatus::Critical);
        assert!(diagnosis.advice.is_empty());
        assert!(diagnosis.assert_resolvable().is_err());
    }

    #[test]
    fn test_assert_resolvable() {
        let mut diagnosis = Diagnosis::new("domains");
        assert!(matches!(
            diagnosis.assert_resolvable(),
            Err(ConfError::NotRepairable(_))
        ));

        diagnosis.compare_and_advise(
            &[("mydomain".to_string(), "other.org".to_string())],
            &baseline(),
        );
        assert!(diagnosis.assert_resolvable().is_ok());
    }
}
