//! Command-line interface for armory.
//!
//! This module provides the CLI structure and output rendering for the
//! `armoryctl` binary.

mod commands;
pub mod output;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::error::ErrorKind;
use crate::logging::Verbosity;

pub use commands::{
    AmmoCommand, ConfigCommand, CustodyCommand, IssueCommand, OfficerCommand, OutputFormat,
    ReturnCommand, StatusArg, WeaponCommand,
};

/// armoryctl - Weapon custody and ammunition accounting
///
/// Registers weapons and ammunition stock, and records every hand-over of a
/// weapon to an officer and its return.
#[derive(Debug, Parser)]
#[command(name = "armoryctl")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Path to the database (overrides configuration)
    #[arg(short, long, global = true, value_name = "PATH")]
    pub database: Option<PathBuf>,

    /// Increase verbosity (-v for custody events, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage the weapon registry
    #[command(subcommand)]
    Weapon(WeaponCommand),

    /// Manage ammunition stock
    #[command(subcommand)]
    Ammo(AmmoCommand),

    /// Manage the local officer directory
    #[command(subcommand)]
    Officer(OfficerCommand),

    /// Issue a weapon to an officer
    Issue(IssueCommand),

    /// Return an issued weapon
    Return(ReturnCommand),

    /// Query custody records
    #[command(subcommand)]
    Custody(CustodyCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.verbose, self.quiet)
    }
}

/// Process exit code for a failed command.
#[must_use]
pub fn exit_code(kind: ErrorKind) -> u8 {
    match kind {
        ErrorKind::Internal => 1,
        ErrorKind::Validation => 3,
        ErrorKind::NotFound => 4,
        ErrorKind::Conflict => 5,
        ErrorKind::InsufficientStock => 6,
        ErrorKind::Config => 78,
    }
}
