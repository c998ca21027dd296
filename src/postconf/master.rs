//! Descriptor for one row of the Postfix master service table.

use serde::{Deserialize, Serialize};

use crate::error::{ConfError, Result};

/// One `master.cf` row: the eight positional fields describing how a mail
/// subsystem process is launched. All fields are free-form strings; any
/// validation happens at the config store boundary on the composed row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceEntry {
    pub service: String,
    pub kind: String,
    pub private: String,
    pub unpriv: String,
    pub chroot: String,
    pub wakeup: String,
    pub maxproc: String,
    pub command_args: String,
}

impl ServiceEntry {
    /// The `service/type` identifier the external tool uses for this row.
    pub fn target(&self) -> String {
        format!("{}/{}", self.service, self.kind)
    }

    /// Join the eight fields with single spaces in fixed order.
    pub fn serialize(&self) -> String {
        [
            self.service.as_str(),
            self.kind.as_str(),
            self.private.as_str(),
            self.unpriv.as_str(),
            self.chroot.as_str(),
            self.wakeup.as_str(),
            self.maxproc.as_str(),
            self.command_args.as_str(),
        ]
        .join(" ")
    }

    /// Reconstruct an entry from a serialized row. The eighth field is the
    /// command plus its arguments, so it absorbs all remaining tokens.
    pub fn parse(row: &str) -> Result<Self> {
        let fields: Vec<&str> = row.split_whitespace().collect();
        if fields.len() < 8 {
            return Err(ConfError::InvalidFormat(format!(
                "service row needs eight fields, got {}",
                fields.len()
            )));
        }

        Ok(ServiceEntry {
            service: fields[0].to_string(),
            kind: fields[1].to_string(),
            private: fields[2].to_string(),
            unpriv: fields[3].to_string(),
            chroot: fields[4].to_string(),
            wakeup: fields[5].to_string(),
            maxproc: fields[6].to_string(),
            command_args: fields[7..].join(" "),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submission() -> ServiceEntry {
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

    #[test]
    fn test_serialize() {
        assert_eq!(submission().serialize(), "submission inet n - y - - smtpd");
        assert_eq!(submission().target(), "submission/inet");
    }

    #[test]
    fn test_round_trip() {
        let entry = submission();
        assert_eq!(ServiceEntry::parse(&entry.serialize()).unwrap(), entry);
    }

    #[test]
    fn test_round_trip_with_command_arguments() {
        let entry = ServiceEntry {
            command_args: "smtpd -o syslog_name=postfix/smtps".to_string(),
            ..submission()
        };
        assert_eq!(ServiceEntry::parse(&entry.serialize()).unwrap(), entry);
    }

    #[test]
    fn test_parse_short_row() {
        assert!(ServiceEntry::parse("smtp inet n - y").is_err());
    }
}
