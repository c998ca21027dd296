//! Audit of the milter hookup for the spam filter and virus scanner.

use std::collections::BTreeMap;

use crate::error::Result;
use crate::postconf::ConfigStore;

use super::{Diagnosis, run_audit};

/// Desired milter settings pointing Postfix at the local filter daemon.
pub fn baseline() -> BTreeMap<String, String> {
    let macros = [
        "{auth_type}",
        "{auth_authen}",
        "{auth_author}",
        "{client_addr}",
        "{client_name}",
        "{mail_addr}",
        "{mail_host}",
        "{mail_mailer}",
    ];

    let mut map = BTreeMap::new();
    map.insert(
        "milter_mail_macros".to_string(),
        format!("i {}", macros.join(" ")),
    );
    map.insert(
        "smtpd_milters".to_string(),
        "inet:127.0.0.1:11332".to_string(),
    );
    map.insert(
        "non_smtpd_milters".to_string(),
        "inet:127.0.0.1:11332".to_string(),
    );
    map
}

/// Audit the milter keys against the baseline.
pub async fn check(store: &ConfigStore) -> Diagnosis {
    run_audit(store, "Postfix milter", &baseline())
        .await
        .with_action("spam")
}

/// Re-apply the milter configuration, drifted or not.
pub async fn apply(store: &ConfigStore) -> Result<()> {
    store.set_many(&baseline()).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_baseline_keys_are_valid() {
        for (key, value) in &baseline() {
            assert!(crate::validate::validate_key(key).is_ok(), "{}", key);
            assert!(crate::validate::validate_value(value).is_ok(), "{}", key);
        }
    }

    #[test]
    fn test_mail_macros_list_the_smtpd_macros() {
        let map = baseline();
        let macros = map.get("milter_mail_macros").unwrap();
        assert!(macros.starts_with("i "));
        assert!(macros.contains("{auth_authen}"));
        assert!(macros.contains("{client_addr}"));
    }
}
