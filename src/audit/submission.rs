//! Audit of SASL authentication and the mail submission services.

use std::collections::BTreeMap;

use crate::error::Result;
use crate::postconf::{ConfigStore, ServiceEntry};

use super::{Diagnosis, run_audit};

/// Desired SASL and mailbox transport settings.
pub fn baseline() -> BTreeMap<String, String> {
    let mut map = BTreeMap::new();
    map.insert("smtpd_sasl_auth_enable".to_string(), "yes".to_string());
    map.insert("smtpd_sasl_type".to_string(), "dovecot".to_string());
    map.insert("smtpd_sasl_path".to_string(), "private/auth".to_string());
    map.insert(
        "mailbox_transport".to_string(),
        "lmtp:unix:private/dovecot-lmtp".to_string(),
    );
    map.insert(
        "virtual_transport".to_string(),
        "lmtp:unix:private/dovecot-lmtp".to_string(),
    );
    map.insert(
        "smtpd_relay_restrictions".to_string(),
        "permit_sasl_authenticated,defer_unauth_destination".to_string(),
    );
    map
}

/// Service table row for the mail submission service (port 587).
pub fn submission_entry() -> ServiceEntry {
    ServiceEntry {
        service: "submission".to_string(),
        kind: "inet".to_string(),
        private: "n".to_string(),
        unpriv: "-".to_string(),
        chroot: "y".to_string(),
        wakeup: "-".to_string(),
        maxproc: "-".to_string(),
        command_args: "smtpd".to_string(),
    }
}

pub fn submission_options() -> BTreeMap<String, String> {
    let mut map = BTreeMap::new();
    map.insert("syslog_name".to_string(), "postfix/submission".to_string());
    map.insert(
        "smtpd_tls_security_level".to_string(),
        "encrypt".to_string(),
    );
    map.insert(
        "smtpd_client_restrictions".to_string(),
        "permit_sasl_authenticated,reject".to_string(),
    );
    map.insert(
        "smtpd_relay_restrictions".to_string(),
        "permit_sasl_authenticated,reject".to_string(),
    );
    map
}

/// Service table row for implicit-TLS submission (port 465).
pub fn smtps_entry() -> ServiceEntry {
    ServiceEntry {
        service: "smtps".to_string(),
        ..submission_entry()
    }
}

pub fn smtps_options() -> BTreeMap<String, String> {
    let mut map = BTreeMap::new();
    map.insert("syslog_name".to_string(), "postfix/smtps".to_string());
    map.insert("smtpd_tls_wrappermode".to_string(), "yes".to_string());
    map.insert("smtpd_sasl_auth_enable".to_string(), "yes".to_string());
    map.insert(
        "smtpd_relay_restrictions".to_string(),
        "permit_sasl_authenticated,reject".to_string(),
    );
    map
}

/// Audit the SASL and transport keys against the baseline.
pub async fn check(store: &ConfigStore) -> Diagnosis {
    run_audit(store, "Mail submission", &baseline())
        .await
        .with_action("submission")
}

/// Re-apply the full submission setup: the main.cf baseline plus both
/// service table rows with their option overrides.
pub async fn apply(store: &ConfigStore) -> Result<()> {
    store.set_many(&baseline()).await?;
    store
        .set_service_entry(&submission_entry(), &submission_options())
        .await?;
    store
        .set_service_entry(&smtps_entry(), &smtps_options())
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_rows() {
        assert_eq!(
            submission_entry().serialize(),
            "submission inet n - y - - smtpd"
        );
        assert_eq!(smtps_entry().serialize(), "smtps inet n - y - - smtpd");
        assert_eq!(smtps_entry().target(), "smtps/inet");
    }

    #[test]
    fn test_baseline_keys_are_valid() {
        for map in [baseline(), submission_options(), smtps_options()] {
            for (key, value) in &map {
                assert!(crate::validate::validate_key(key).is_ok(), "{}", key);
                assert!(crate::validate::validate_value(value).is_ok(), "{}", key);
            }
        }
    }
}
