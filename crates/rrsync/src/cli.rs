//! Command-line arguments
//!
//! Records are addressed by locator, `domain:TYPE:name:data`, like
//! `example.com:TXT:@:v=spf1 -all`.

use clap::{Args, Parser, Subcommand};
use rrsync_core::{DnsRecord, RecordLocator};

/// Manage single DNS records over a whole-set registrar API
///
/// Credentials and pacing are read from the environment (RRSYNC_API_KEY,
/// RRSYNC_API_SECRET, RRSYNC_RATE_RPS, ...).
#[derive(Parser, Debug)]
#[command(name = "rrsync")]
#[command(version)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the record matching the locator as JSON
    Get(RecordArgs),

    /// Add the record
    Create(RecordArgs),

    /// Replace the record matching the locator
    Update {
        #[command(flatten)]
        record: RecordArgs,

        /// New record data
        #[arg(long)]
        data: String,

        /// Create the record if the one to update is gone
        #[arg(long)]
        recreate: bool,
    },

    /// Delete the record matching the locator
    Delete(RecordArgs),
}

/// Record selection shared by all subcommands
#[derive(Args, Debug, Clone)]
pub struct RecordArgs {
    /// Record locator, `domain:TYPE:name:data`
    pub locator: RecordLocator,

    /// TTL in seconds
    #[arg(long)]
    pub ttl: Option<u32>,

    /// Priority (MX and SRV)
    #[arg(long)]
    pub priority: Option<u16>,
}

impl RecordArgs {
    /// Domain and record described by the arguments
    pub fn into_parts(self) -> (String, DnsRecord) {
        let RecordLocator { domain, mut record } = self.locator;
        if let Some(ttl) = self.ttl {
            record.ttl = ttl;
        }
        if let Some(priority) = self.priority {
            record.priority = priority;
        }
        (domain, record)
    }
}

impl Command {
    /// Subcommand name for logging
    pub fn name(&self) -> &'static str {
        match self {
            Command::Get(_) => "get",
            Command::Create(_) => "create",
            Command::Update { .. } => "update",
            Command::Delete(_) => "delete",
        }
    }
}
