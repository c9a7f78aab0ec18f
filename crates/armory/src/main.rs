//! `armoryctl` - CLI for armory
//!
//! This binary provides the command-line interface for the weapon registry,
//! the ammunition stock ledger and custody events.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::path::Path;
use std::process::ExitCode;

use chrono::Local;
use clap::Parser;

use armory::cli::{
    exit_code, output, AmmoCommand, Cli, Command, ConfigCommand, CustodyCommand, IssueCommand,
    OfficerCommand, ReturnCommand, WeaponCommand,
};
use armory::{
    init_logging, Config, CustodyCoordinator, IssueRequest, NewAmmunition, NewOfficer, NewWeapon,
    Result, ReturnRequest, Storage, WeaponUpdate,
};

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(exit_code(e.kind()))
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let Cli {
        config: config_path,
        database,
        command,
        ..
    } = cli;

    // Config commands must work even when the configuration is broken
    let command = match command {
        Command::Config(cmd) => return handle_config(config_path, cmd),
        command => command,
    };

    let config = Config::load_from(config_path)?;
    let storage = open_storage(&config, database.as_deref())?;

    match command {
        Command::Weapon(cmd) => handle_weapon(&storage, cmd),
        Command::Ammo(cmd) => handle_ammo(&storage, cmd),
        Command::Officer(cmd) => handle_officer(&storage, cmd),
        Command::Issue(cmd) => handle_issue(&config, &storage, cmd),
        Command::Return(cmd) => handle_return(&config, &storage, cmd),
        Command::Custody(cmd) => handle_custody(&storage, cmd),
        Command::Config(_) => Ok(()),
    }
}

fn open_storage(config: &Config, database: Option<&Path>) -> Result<Storage> {
    let path = database.map_or_else(|| config.database_path(), Path::to_path_buf);
    Storage::open_with(path, config.storage_options()?)
}

fn handle_weapon(storage: &Storage, cmd: WeaponCommand) -> Result<()> {
    match cmd {
        WeaponCommand::Register {
            serial,
            weapon_type,
            remarks,
        } => {
            let mut new = NewWeapon::new(serial, weapon_type);
            new.remarks = remarks;
            let weapon = storage.register_weapon(&new)?;
            println!("Registered weapon {}", weapon.serial_number);
        }
        WeaponCommand::Show { serial, format } => {
            print!("{}", output::weapon(&storage.weapon(&serial)?, format)?);
        }
        WeaponCommand::List { status, format } => {
            let weapons = match status {
                Some(status) => storage.weapons_by_status(status.into())?,
                None => storage.weapons()?,
            };
            print!("{}", output::weapons(&weapons, format)?);
        }
        WeaponCommand::Update {
            serial,
            weapon_type,
            remarks,
            status,
        } => {
            let update = WeaponUpdate {
                weapon_type,
                remarks,
                status: status.map(Into::into),
            };
            if update.is_empty() {
                println!("Nothing to update.");
                return Ok(());
            }
            let weapon = storage.update_weapon(&serial, &update)?;
            println!("Updated weapon {}", weapon.serial_number);
        }
        WeaponCommand::Overview { format } => {
            print!("{}", output::overview(&storage.weapon_overview()?, format)?);
        }
    }
    Ok(())
}

fn handle_ammo(storage: &Storage, cmd: AmmoCommand) -> Result<()> {
    match cmd {
        AmmoCommand::Register {
            ammunition_type,
            magazines,
            remarks,
        } => {
            let mut new = NewAmmunition::new(ammunition_type, magazines);
            new.remarks = remarks;
            let stock = storage.register_ammunition(&new)?;
            println!(
                "Registered {} with {} magazines",
                stock.ammunition_type, stock.magazines
            );
        }
        AmmoCommand::Show {
            ammunition_type,
            format,
        } => {
            print!(
                "{}",
                output::stock(&storage.ammunition_stock(&ammunition_type)?, format)?
            );
        }
        AmmoCommand::List { format } => {
            print!("{}", output::stocks(&storage.ammunition()?, format)?);
        }
        AmmoCommand::Restock {
            ammunition_type,
            delta,
        } => {
            let stock = storage.restock_ammunition(&ammunition_type, delta)?;
            println!(
                "{} now has {} magazines",
                stock.ammunition_type, stock.magazines
            );
        }
        AmmoCommand::Remarks {
            ammunition_type,
            remarks,
        } => {
            let stock = storage.update_ammunition_remarks(&ammunition_type, remarks.as_deref())?;
            println!("Updated remarks for {}", stock.ammunition_type);
        }
    }
    Ok(())
}

fn handle_officer(storage: &Storage, cmd: OfficerCommand) -> Result<()> {
    match cmd {
        OfficerCommand::Add {
            name,
            id,
            badge,
            role,
        } => {
            let new = NewOfficer {
                id,
                name,
                badge_no: badge,
                role,
            };
            let officer = storage.register_officer(&new)?;
            println!("Added officer {} ({})", officer.id, officer.name);
        }
        OfficerCommand::List { format } => {
            print!("{}", output::officers(&storage.active_officers()?, format)?);
        }
    }
    Ok(())
}

fn handle_issue(config: &Config, storage: &Storage, cmd: IssueCommand) -> Result<()> {
    let due_date = cmd
        .due
        .unwrap_or_else(|| config.default_due_date(Local::now().date_naive()));

    let request = IssueRequest {
        weapon_serial: cmd.serial,
        issued_to: cmd.issued_to,
        handed_over_by: cmd.handed_over_by,
        due_date,
        issue_note: cmd.note,
        ammunition_type: cmd.ammo_type,
        magazines: cmd.magazines,
        ammunition_note: cmd.ammo_note,
    };

    let coordinator =
        CustodyCoordinator::new(storage, storage).with_policy(config.custody_policy());
    let record = coordinator.issue(&request)?;
    print!("{}", output::record(&record, cmd.format)?);
    Ok(())
}

fn handle_return(config: &Config, storage: &Storage, cmd: ReturnCommand) -> Result<()> {
    let request = ReturnRequest {
        weapon_serial: cmd.serial,
        received_by: cmd.received_by,
        return_note: cmd.note,
        returned_magazines: cmd.returned_magazines,
        used_bullets: cmd.used_bullets,
        ammunition_condition: cmd.condition,
        ammunition_note: cmd.ammo_note,
    };

    let coordinator =
        CustodyCoordinator::new(storage, storage).with_policy(config.custody_policy());
    let record = coordinator.return_weapon(&request)?;
    print!("{}", output::record(&record, cmd.format)?);
    Ok(())
}

fn handle_custody(storage: &Storage, cmd: CustodyCommand) -> Result<()> {
    match cmd {
        CustodyCommand::Open { serial, format } => match storage.open_record(&serial)? {
            Some(record) => print!("{}", output::record(&record, format)?),
            None => {
                // Unknown serial is an error, a returned weapon is not
                storage.weapon(&serial)?;
                println!("Weapon {} is not issued.", serial.trim());
            }
        },
        CustodyCommand::History { serial, format } => {
            storage.weapon(&serial)?;
            print!("{}", output::records(&storage.custody_history(&serial)?, format)?);
        }
        CustodyCommand::Overdue { as_of, format } => {
            let as_of = as_of.unwrap_or_else(|| Local::now().date_naive());
            print!("{}", output::records(&storage.overdue_records(as_of)?, format)?);
        }
        CustodyCommand::Reconcile { format } => {
            print!("{}", output::discrepancies(&storage.reconcile()?, format)?);
        }
        CustodyCommand::Stats { format } => {
            print!("{}", output::stats(&storage.stats()?, format)?);
        }
    }
    Ok(())
}

fn handle_config(config_path: Option<std::path::PathBuf>, cmd: ConfigCommand) -> Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            let config = Config::load_from(config_path)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Storage]");
                println!("  Database path:      {}", config.database_path().display());
                println!("  Busy timeout (ms):  {}", config.storage.busy_timeout_ms);
                println!();
                println!("[Registry]");
                println!("  Serial pattern:     {}", config.registry.serial_pattern);
                println!();
                println!("[Custody]");
                println!("  Loan days:          {}", config.custody.default_loan_days);
                println!(
                    "  Return note:        {}",
                    config.custody.default_return_note
                );
                println!(
                    "  Ammo condition:     {}",
                    config.custody.default_ammunition_condition
                );
            }
        }
        ConfigCommand::Path => {
            println!(
                "{}",
                config_path
                    .unwrap_or_else(Config::default_config_path)
                    .display()
            );
        }
        ConfigCommand::Validate { file } => {
            let result = match file {
                Some(path) => {
                    println!("Validating configuration: {}", path.display());
                    Config::load_file(&path)
                }
                None => {
                    let path = config_path.unwrap_or_else(Config::default_config_path);
                    println!("Validating configuration: {}", path.display());
                    Config::load_from(Some(path))
                }
            };
            result?;
            println!("Configuration is valid.");
        }
    }
    Ok(())
}
