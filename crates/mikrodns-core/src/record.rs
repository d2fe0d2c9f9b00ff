//! The record model: desired state, reconciliation intent and the router's
//! view of a static DNS entry.

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use crate::error::{Error, Result};

/// A desired static DNS record: fully-qualified name plus address.
///
/// The name is the lookup key and is matched case-sensitively against the
/// router's stored entry names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsRecord {
    /// Fully-qualified domain name
    pub fqdn: String,
    /// Target address (v4 or v6)
    pub address: IpAddr,
}

impl DnsRecord {
    /// Build a record, validating the name
    pub fn new(fqdn: impl Into<String>, address: IpAddr) -> Result<Self> {
        let fqdn = fqdn.into();
        validate_fqdn(&fqdn)?;
        Ok(Self { fqdn, address })
    }
}

impl fmt::Display for DnsRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.fqdn, self.address)
    }
}

/// Reconciliation intent carried by the webhook payload's `action` key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordAction {
    /// Insert a new entry without looking for an existing one
    Create,
    /// Upsert: replace the address in place if the name exists, else create
    Update,
    /// Remove the entry if it exists
    Delete,
}

impl FromStr for RecordAction {
    type Err = Error;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "create" => Ok(Self::Create),
            "update" => Ok(Self::Update),
            "delete" => Ok(Self::Delete),
            _ => Err(Error::validation(
                "action",
                format!("unknown action {raw:?}, expected create, update or delete"),
            )),
        }
    }
}

/// A validated change, ready to apply against the router
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordChange {
    /// Insert without existence check
    Create(DnsRecord),
    /// Create-if-absent, else update-in-place
    Update(DnsRecord),
    /// Remove by name; succeeds even when no entry matches
    Delete {
        /// Name of the entry to remove
        fqdn: String,
    },
}

impl RecordChange {
    /// The record name this change targets
    pub fn fqdn(&self) -> &str {
        match self {
            Self::Create(record) | Self::Update(record) => &record.fqdn,
            Self::Delete { fqdn } => fqdn,
        }
    }
}

/// One row of the router's static DNS table, as returned by lookup.
///
/// `id` is the router-assigned item identity (`*1`, `*2`, ...); updates and
/// removals address entries through it, which is what keeps an upsert from
/// changing record identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticDnsEntry {
    /// Router-assigned item id
    pub id: String,
    /// Entry name
    pub name: String,
    /// Entry address, as stored by the router
    pub address: String,
}

/// Validate a fully-qualified domain name.
///
/// Basic RFC 1035 shape: at most 253 characters total, labels of 1-63
/// alphanumeric-or-hyphen characters, no leading or trailing hyphen.
pub fn validate_fqdn(fqdn: &str) -> Result<()> {
    if fqdn.is_empty() {
        return Err(Error::validation("fqdn", "must not be empty"));
    }

    if fqdn.len() > 253 {
        return Err(Error::validation(
            "fqdn",
            format!("{} characters is longer than the 253 allowed", fqdn.len()),
        ));
    }

    for label in fqdn.split('.') {
        if label.is_empty() {
            return Err(Error::validation("fqdn", "contains an empty label"));
        }

        if label.len() > 63 {
            return Err(Error::validation(
                "fqdn",
                format!("label {label:?} is longer than the 63 characters allowed"),
            ));
        }

        if !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(Error::validation(
                "fqdn",
                format!("label {label:?} contains characters outside [a-zA-Z0-9-]"),
            ));
        }

        if label.starts_with('-') || label.ends_with('-') {
            return Err(Error::validation(
                "fqdn",
                format!("label {label:?} starts or ends with a hyphen"),
            ));
        }
    }

    Ok(())
}
