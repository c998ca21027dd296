//! Audit of the domains Postfix accepts mail for.

use std::collections::BTreeMap;

use crate::error::Result;
use crate::postconf::{parse_token_list, ConfigStore};

use super::{Diagnosis, run_audit};

/// Destinations Postfix should always accept regardless of the declared
/// domain list.
pub const MYDESTINATION_DEFAULTS: [&str; 3] = ["$myhostname", "localhost.$mydomain", "localhost"];

/// Current domain configuration as observed from the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainConfig {
    pub primary_domain: String,
    /// Declared domains, with the built-in defaults filtered out.
    pub all_domains: Vec<String>,
}

/// Read the current primary domain and accepted domain list.
pub async fn get_domains(store: &ConfigStore) -> Result<DomainConfig> {
    let current = store.get_many(&["mydomain", "mydestination"]).await?;
    let mydomain = &current[0].1;
    let destinations = parse_token_list(&current[1].1)?;

    let all_domains = destinations
        .into_iter()
        .filter(|d| !MYDESTINATION_DEFAULTS.contains(&d.as_str()))
        .collect();

    Ok(DomainConfig {
        primary_domain: mydomain.clone(),
        all_domains,
    })
}

/// Desired values for the domain keys given a declared primary domain and
/// domain list. `mydestination` is the declared domains plus the defaults.
pub fn baseline(primary_domain: &str, all_domains: &[String]) -> BTreeMap<String, String> {
    let mut destinations: Vec<String> = all_domains.to_vec();
    for default in MYDESTINATION_DEFAULTS {
        if !destinations.iter().any(|d| d == default) {
            destinations.push(default.to_string());
        }
    }

    let mut map = BTreeMap::new();
    map.insert("mydomain".to_string(), primary_domain.to_string());
    map.insert("myhostname".to_string(), primary_domain.to_string());
    map.insert("mydestination".to_string(), destinations.join(", "));
    map
}

/// Audit the domain keys against the declared domain list.
pub async fn check(
    store: &ConfigStore,
    primary_domain: &str,
    all_domains: &[String],
) -> Diagnosis {
    run_audit(store, "Postfix domains", &baseline(primary_domain, all_domains))
        .await
        .with_action("domain")
}

/// Write the declared domain configuration, drifted or not.
pub async fn apply(
    store: &ConfigStore,
    primary_domain: &str,
    all_domains: &[String],
) -> Result<()> {
    store.set_many(&baseline(primary_domain, all_domains)).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_baseline_includes_defaults() {
        let domains = vec!["example.com".to_string()];
        let map = baseline("example.com", &domains);

        assert_eq!(map.get("mydomain").unwrap(), "example.com");
        assert_eq!(map.get("myhostname").unwrap(), "example.com");
        assert_eq!(
            map.get("mydestination").unwrap(),
            "example.com, $myhostname, localhost.$mydomain, localhost"
        );
    }

    #[test]
    fn test_baseline_does_not_duplicate_defaults() {
        let domains = vec!["example.com".to_string(), "localhost".to_string()];
        let map = baseline("example.com", &domains);
        let destinations = map.get("mydestination").unwrap();

        assert_eq!(
            destinations.matches("localhost").count(),
            // "localhost.$mydomain" also contains the substring.
            2
        );
    }
}
