// # DNS records
//
// Value types exchanged with a record store. Records have no identity of
// their own: two records are the same remote object only if the key matcher
// says so (see `key.rs`).
//
// Names are relative to the domain and may contain `.` for sub-names; `@`
// denotes the domain apex.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Largest TTL the registrar accepts (one week)
pub const MAX_TTL: u32 = 604_800;

/// TTL used when the caller does not choose one
pub const DEFAULT_TTL: u32 = 3600;

/// Lower TTLs are accepted but the registrar may not honour them
pub const RECOMMENDED_MIN_TTL: u32 = 600;

/// DNS record type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RecordType {
    /// IPv4 address
    A,
    /// IPv6 address
    Aaaa,
    /// Canonical name (alias)
    Cname,
    /// Mail exchanger
    Mx,
    /// Name server
    Ns,
    /// Start of authority
    Soa,
    /// Service locator
    Srv,
    /// Free-form text
    Txt,
}

impl RecordType {
    /// All record types, in declaration order
    pub const ALL: [RecordType; 8] = [
        RecordType::A,
        RecordType::Aaaa,
        RecordType::Cname,
        RecordType::Mx,
        RecordType::Ns,
        RecordType::Soa,
        RecordType::Srv,
        RecordType::Txt,
    ];

    /// Upper-case name as used on the wire
    pub fn as_str(self) -> &'static str {
        match self {
            RecordType::A => "A",
            RecordType::Aaaa => "AAAA",
            RecordType::Cname => "CNAME",
            RecordType::Mx => "MX",
            RecordType::Ns => "NS",
            RecordType::Soa => "SOA",
            RecordType::Srv => "SRV",
            RecordType::Txt => "TXT",
        }
    }

    /// Whether records of this type carry a priority
    pub fn has_priority(self) -> bool {
        matches!(self, RecordType::Mx | RecordType::Srv)
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RecordType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                Error::validation(format!(
                    "unknown record type '{}' (expected one of A, AAAA, CNAME, MX, NS, SOA, SRV, TXT)",
                    s
                ))
            })
    }
}

/// A single DNS resource record
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DnsRecord {
    /// Name relative to the domain (`@` for the apex)
    pub name: String,

    /// Record type
    #[serde(rename = "type")]
    pub record_type: RecordType,

    /// Payload: address, target host, text, ...
    pub data: String,

    /// Time-to-live in seconds
    pub ttl: u32,

    /// Priority (MX and SRV)
    #[serde(default)]
    pub priority: u16,

    /// SRV weight
    #[serde(default)]
    pub weight: u16,

    /// SRV protocol, like `_tcp`
    #[serde(default)]
    pub protocol: String,

    /// SRV service, like `_ldap`
    #[serde(default)]
    pub service: String,

    /// SRV port
    #[serde(default)]
    pub port: u16,
}

impl DnsRecord {
    /// Create a record with the default TTL and no priority or SRV fields
    pub fn new(record_type: RecordType, name: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            record_type,
            data: data.into(),
            ttl: DEFAULT_TTL,
            priority: 0,
            weight: 0,
            protocol: String::new(),
            service: String::new(),
            port: 0,
        }
    }

    /// Set the TTL
    pub fn with_ttl(mut self, ttl: u32) -> Self {
        self.ttl = ttl;
        self
    }

    /// Set the priority
    pub fn with_priority(mut self, priority: u16) -> Self {
        self.priority = priority;
        self
    }

    /// Set the SRV-specific fields
    pub fn with_srv(
        mut self,
        protocol: impl Into<String>,
        service: impl Into<String>,
        port: u16,
        weight: u16,
    ) -> Self {
        self.protocol = protocol.into();
        self.service = service.into();
        self.port = port;
        self.weight = weight;
        self
    }

    /// Convert into the whole-set replace payload by dropping name and type
    pub fn to_update_record(&self) -> DnsUpdateRecord {
        DnsUpdateRecord {
            data: self.data.clone(),
            ttl: self.ttl,
            priority: self.priority,
            weight: self.weight,
            protocol: self.protocol.clone(),
            service: self.service.clone(),
            port: self.port,
        }
    }

    /// Check structural preconditions for using this record as an intent
    ///
    /// A TTL below [`RECOMMENDED_MIN_TTL`] is accepted with a warning.
    pub fn validate(&self) -> Result<(), Error> {
        if self.name.is_empty() {
            return Err(Error::validation("record name cannot be empty (use '@' for the apex)"));
        }
        if self.data.is_empty() {
            return Err(Error::validation(format!(
                "{} record '{}' has empty data",
                self.record_type, self.name
            )));
        }
        if self.ttl > MAX_TTL {
            return Err(Error::validation(format!(
                "TTL {} is out of range (0..={})",
                self.ttl, MAX_TTL
            )));
        }
        if self.record_type == RecordType::Soa {
            return Err(Error::validation(
                "SOA records are maintained by the registrar and cannot be managed",
            ));
        }
        if self.ttl < RECOMMENDED_MIN_TTL {
            tracing::warn!(
                "TTL {} for {} record '{}' is below the recommended minimum of {}",
                self.ttl,
                self.record_type,
                self.name,
                RECOMMENDED_MIN_TTL
            );
        }
        Ok(())
    }
}

impl fmt::Display for DnsRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {} ttl={}", self.record_type, self.name, self.data, self.ttl)?;
        if self.record_type.has_priority() {
            write!(f, " prio={}", self.priority)?;
        }
        Ok(())
    }
}

/// A record without name and type, for whole-set replace calls
///
/// The target key of a replace call is given by its path, so the payload
/// records cannot carry a name or type of their own.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct DnsUpdateRecord {
    pub data: String,
    pub ttl: u32,
    #[serde(default)]
    pub priority: u16,
    #[serde(default)]
    pub weight: u16,
    #[serde(default)]
    pub protocol: String,
    #[serde(default)]
    pub service: String,
    #[serde(default)]
    pub port: u16,
}

impl DnsUpdateRecord {
    /// Re-attach a name and type
    pub fn into_record(self, record_type: RecordType, name: impl Into<String>) -> DnsRecord {
        DnsRecord {
            name: name.into(),
            record_type,
            data: self.data,
            ttl: self.ttl,
            priority: self.priority,
            weight: self.weight,
            protocol: self.protocol,
            service: self.service,
            port: self.port,
        }
    }
}
