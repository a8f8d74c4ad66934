//! Record key matching
//!
//! The registrar has no record IDs, so a record is located by comparing it
//! against the records fetched for its (type, name). What has to match
//! depends on the type:
//!
//! | type                 | rule            | same key when                       |
//! |----------------------|-----------------|-------------------------------------|
//! | CNAME, SOA           | `Singleton`     | always (only one can exist)         |
//! | A, AAAA, MX, NS, TXT | `Data`          | data equal                          |
//! | SRV                  | `SrvEndpoint`   | data, protocol, service, port equal |
//!
//! MX priority is not part of the key: two MX records with the same host and
//! different priorities are the same object and collapse into one on update.

use super::record::{DnsRecord, RecordType};

/// How records of a type are told apart within one (type, name) set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyRule {
    /// At most one record per (type, name)
    Singleton,
    /// Many records per (type, name), distinguished by data
    Data,
    /// Many records per (type, name), distinguished by data and endpoint
    SrvEndpoint,
}

impl KeyRule {
    fn matches(self, a: &DnsRecord, b: &DnsRecord) -> bool {
        match self {
            KeyRule::Singleton => true,
            KeyRule::Data => a.data == b.data,
            KeyRule::SrvEndpoint => {
                a.data == b.data
                    && a.protocol == b.protocol
                    && a.service == b.service
                    && a.port == b.port
            }
        }
    }
}

impl RecordType {
    /// The key rule for this type
    pub fn key_rule(self) -> KeyRule {
        match self {
            RecordType::Cname | RecordType::Soa => KeyRule::Singleton,
            RecordType::A | RecordType::Aaaa | RecordType::Mx | RecordType::Ns | RecordType::Txt => {
                KeyRule::Data
            }
            RecordType::Srv => KeyRule::SrvEndpoint,
        }
    }

    /// Whether at most one record of this type can exist per name
    pub fn is_single_value(self) -> bool {
        self.key_rule() == KeyRule::Singleton
    }
}

/// Whether `a` and `b` denote the same remote record
pub fn same_key(a: &DnsRecord, b: &DnsRecord) -> bool {
    if a.record_type != b.record_type || a.name != b.name {
        return false;
    }
    a.record_type.key_rule().matches(a, b)
}
