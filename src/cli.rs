/* src/cli.rs */

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Browse and bulk-manage DNS zones as a tree
#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the zone hierarchy, honoring expand/collapse state
    Tree {
        /// Show every zone regardless of expansion
        #[arg(long)]
        all: bool,
        /// Emit view rows as JSON
        #[arg(long)]
        json: bool,
    },
    /// Expand one or more zones
    Expand {
        #[arg(required = true)]
        zones: Vec<String>,
    },
    /// Collapse a zone
    Collapse { zone: String },
    /// Expand every zone that has children
    ExpandAll,
    /// Collapse everything
    CollapseAll,
    /// Apply an operation to a zone and optionally all of its descendants
    Cascade(CascadeArgs),
    /// Create a zone, optionally inheriting settings from an ancestor
    Create(CreateArgs),
    /// Show which zone backend is in use
    Status,
}

#[derive(Debug, Parser)]
pub struct CascadeArgs {
    /// Root zone of the operation
    pub zone: String,
    /// Include every zone below the root
    #[arg(long)]
    pub descendants: bool,
    #[command(subcommand)]
    pub action: CascadeAction,
}

#[derive(Debug, Subcommand)]
pub enum CascadeAction {
    /// Delete the selected zones
    Delete,
    /// Write the selected zones as JSON
    Export {
        #[arg(long, value_name = "FILE")]
        out: Option<PathBuf>,
    },
    /// Replace the nameservers of the selected zones
    SetNs {
        #[arg(required = true)]
        nameservers: Vec<String>,
    },
}

#[derive(Debug, Parser)]
pub struct CreateArgs {
    /// Fully qualified name of the new zone
    pub name: String,
    /// Zone to inherit settings from
    #[arg(long, value_name = "ZONE", conflicts_with = "auto_inherit")]
    pub inherit_from: Option<String>,
    /// Inherit from the nearest existing ancestor
    #[arg(long)]
    pub auto_inherit: bool,
    /// Inherit nameservers
    #[arg(long)]
    pub ns: bool,
    /// Inherit SOA timers and contacts
    #[arg(long)]
    pub soa: bool,
    /// Inherit the default TTL
    #[arg(long)]
    pub ttl: bool,
    /// Nameserver for the new zone (repeatable)
    #[arg(long = "nameserver", value_name = "NS")]
    pub nameservers: Vec<String>,
}
