//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Subcommand, ValueEnum};

use crate::officer::OfficerId;
use crate::weapon::WeaponStatus;

/// Weapon registry commands.
#[derive(Debug, Subcommand)]
pub enum WeaponCommand {
    /// Register a new weapon
    Register {
        /// Serial number
        serial: String,

        /// Weapon type, e.g. Pistol
        #[arg(short = 't', long = "type")]
        weapon_type: String,

        /// Free-text remarks
        #[arg(short, long)]
        remarks: Option<String>,
    },

    /// Show one weapon
    Show {
        /// Serial number
        serial: String,

        /// Output format
        #[arg(short, long, value_enum, default_value = "plain")]
        format: OutputFormat,
    },

    /// List registered weapons
    List {
        /// Only weapons with this status
        #[arg(short, long, value_enum)]
        status: Option<StatusArg>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// Change weapon metadata
    Update {
        /// Serial number
        serial: String,

        /// New weapon type
        #[arg(short = 't', long = "type")]
        weapon_type: Option<String>,

        /// New remarks; pass "" to clear
        #[arg(short, long)]
        remarks: Option<String>,

        /// Override the custody status (corrections only)
        #[arg(short, long, value_enum)]
        status: Option<StatusArg>,
    },

    /// List every weapon with its current holder
    Overview {
        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,
    },
}

/// Ammunition stock commands.
#[derive(Debug, Subcommand)]
pub enum AmmoCommand {
    /// Register an ammunition type
    Register {
        /// Ammunition type, e.g. 9mm
        ammunition_type: String,

        /// Opening magazine count
        #[arg(short, long, default_value = "0")]
        magazines: i64,

        /// Free-text remarks
        #[arg(short, long)]
        remarks: Option<String>,
    },

    /// Show stock for one ammunition type
    Show {
        /// Ammunition type
        ammunition_type: String,

        /// Output format
        #[arg(short, long, value_enum, default_value = "plain")]
        format: OutputFormat,
    },

    /// List all ammunition stock
    List {
        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// Add (or with a negative count, write off) magazines
    Restock {
        /// Ammunition type
        ammunition_type: String,

        /// Magazines to add; negative to remove
        #[arg(allow_negative_numbers = true)]
        delta: i64,
    },

    /// Replace the remarks of an ammunition type
    Remarks {
        /// Ammunition type
        ammunition_type: String,

        /// New remarks; omit to clear
        remarks: Option<String>,
    },
}

/// Officer directory commands.
#[derive(Debug, Subcommand)]
pub enum OfficerCommand {
    /// Add an officer to the local directory
    Add {
        /// Display name
        name: String,

        /// Explicit id (defaults to the next free id)
        #[arg(long)]
        id: Option<OfficerId>,

        /// Badge number
        #[arg(short, long)]
        badge: Option<String>,

        /// Role, e.g. OIC
        #[arg(short, long)]
        role: Option<String>,
    },

    /// List active officers
    List {
        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,
    },
}

/// Issue command arguments.
#[derive(Debug, Args)]
pub struct IssueCommand {
    /// Serial of the weapon to issue
    pub serial: String,

    /// Officer receiving the weapon
    #[arg(long = "to", value_name = "ID")]
    pub issued_to: OfficerId,

    /// Officer handing the weapon over
    #[arg(long = "by", value_name = "ID")]
    pub handed_over_by: OfficerId,

    /// Due date (YYYY-MM-DD); defaults to today plus the configured loan period
    #[arg(long, value_name = "DATE")]
    pub due: Option<NaiveDate>,

    /// Issue note
    #[arg(short, long)]
    pub note: Option<String>,

    /// Ammunition type to draw
    #[arg(long, requires = "magazines")]
    pub ammo_type: Option<String>,

    /// Magazines to draw
    #[arg(long, requires = "ammo_type")]
    pub magazines: Option<i64>,

    /// Note about the ammunition
    #[arg(long)]
    pub ammo_note: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "plain")]
    pub format: OutputFormat,
}

/// Return command arguments.
#[derive(Debug, Args)]
pub struct ReturnCommand {
    /// Serial of the weapon being returned
    pub serial: String,

    /// Officer taking the weapon back
    #[arg(long, value_name = "ID")]
    pub received_by: OfficerId,

    /// Return note
    #[arg(short, long)]
    pub note: Option<String>,

    /// Magazines handed back
    #[arg(long)]
    pub returned_magazines: Option<i64>,

    /// Bullets fired while out
    #[arg(long)]
    pub used_bullets: Option<i64>,

    /// Condition of the returned ammunition
    #[arg(long)]
    pub condition: Option<String>,

    /// Note about the returned ammunition
    #[arg(long)]
    pub ammo_note: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "plain")]
    pub format: OutputFormat,
}

/// Custody record queries.
#[derive(Debug, Subcommand)]
pub enum CustodyCommand {
    /// Show the open record of a weapon
    Open {
        /// Serial number
        serial: String,

        /// Output format
        #[arg(short, long, value_enum, default_value = "plain")]
        format: OutputFormat,
    },

    /// Show every record of a weapon, most recent first
    History {
        /// Serial number
        serial: String,

        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// List open records past their due date
    Overdue {
        /// Reference date (YYYY-MM-DD); defaults to today
        #[arg(long, value_name = "DATE")]
        as_of: Option<NaiveDate>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// List weapons whose status disagrees with their records
    Reconcile {
        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// Show database statistics
    Stats {
        /// Output format
        #[arg(short, long, value_enum, default_value = "plain")]
        format: OutputFormat,
    },
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Weapon status argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StatusArg {
    /// In the armory
    Available,
    /// Checked out
    Issued,
}

impl From<StatusArg> for WeaponStatus {
    fn from(arg: StatusArg) -> Self {
        match arg {
            StatusArg::Available => Self::Available,
            StatusArg::Issued => Self::Issued,
        }
    }
}

/// Output format for commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Plain text output
    #[default]
    Plain,
    /// Formatted table
    Table,
    /// JSON output
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_arg_conversion() {
        assert_eq!(
            WeaponStatus::from(StatusArg::Available),
            WeaponStatus::Available
        );
        assert_eq!(WeaponStatus::from(StatusArg::Issued), WeaponStatus::Issued);
    }

    #[test]
    fn test_output_format_default() {
        assert_eq!(OutputFormat::default(), OutputFormat::Plain);
    }

    #[test]
    fn test_config_command_debug() {
        let cmd = ConfigCommand::Show { json: false };
        let debug_str = format!("{cmd:?}");
        assert!(debug_str.contains("Show"));
    }
}
