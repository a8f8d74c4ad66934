//! `domain:TYPE:name:data` record identifiers
//!
//! Used to address an existing record from the command line, e.g.
//! `example.com:CNAME:www.dev:www.other.com`. Only the first three `:`
//! separate fields, so AAAA data like `2001:db8::1` needs no escaping.

use std::fmt;
use std::str::FromStr;

use super::record::{DnsRecord, RecordType};
use crate::error::Error;

/// A record together with the domain it lives in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordLocator {
    pub domain: String,
    pub record: DnsRecord,
}

impl FromStr for RecordLocator {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.splitn(4, ':').collect();
        if parts.len() != 4 || parts.iter().any(|p| p.is_empty()) {
            return Err(Error::validation(format!(
                "expected identifier format domain:TYPE:name:data, \
                like mydom.com:CNAME:www.subdom:www.other.com. Got: {:?}",
                s
            )));
        }

        let record_type: RecordType = parts[1].parse()?;
        Ok(Self {
            domain: parts[0].to_string(),
            record: DnsRecord::new(record_type, parts[2], parts[3]),
        })
    }
}

impl fmt::Display for RecordLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}",
            self.domain, self.record.record_type, self.record.name, self.record.data
        )
    }
}
