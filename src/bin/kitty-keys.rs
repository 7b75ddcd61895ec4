#![forbid(unsafe_code)]
//! Manage kittyboard keys and the address book from the shell

use clap::{Parser, Subcommand};
use colored::*;
use comfy_table::presets::UTF8_FULL;
use comfy_table::Color as TableColor;
use comfy_table::{Attribute, Cell, ContentArrangement, Table};
use kittyboard::addressbook::AddressBook;
use kittyboard::config::{load_config, Config, DEFAULT_CONFIG_FILE};
use kittyboard::crypto::{generate_mnemonic, AccountId, KeyPair};
use kittyboard::secretstore::SecretStore;
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the configuration file
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,
    /// Directory holding keys.json and addressbook.json
    #[arg(long)]
    data_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a new 12-word phrase and store it
    Generate {
        /// Name for the new key
        name: String,
    },
    /// Store an existing phrase
    Add {
        name: String,
        /// BIP-39 mnemonic or development phrase
        phrase: String,
    },
    /// List stored keys
    List,
    /// Remove a stored key
    Forget { name: String },
    /// Address book commands
    #[command(subcommand)]
    Book(BookCommands),
}

#[derive(Subcommand)]
enum BookCommands {
    /// Name an account
    Add {
        label: String,
        /// Account in hex
        account: String,
        #[arg(long)]
        notes: Option<String>,
    },
    /// List named accounts
    List {
        /// Only show entries matching this text
        #[arg(long)]
        search: Option<String>,
    },
    /// Remove a named account
    Remove { label: String },
    /// Export the address book as CSV
    Export { path: PathBuf },
}

fn header(labels: &[&str]) -> Vec<Cell> {
    labels
        .iter()
        .map(|l| Cell::new(l).fg(TableColor::Cyan).add_attribute(Attribute::Bold))
        .collect()
}

fn new_table(labels: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header(labels));
    table
}

fn list_keys(secrets: &SecretStore) {
    if secrets.is_empty() {
        println!("{}", "No keys stored yet. Try 'kitty-keys generate <name>'.".yellow());
        return;
    }
    let mut table = new_table(&["Name", "Account", "Created"]);
    for entry in secrets.list() {
        table.add_row(vec![
            Cell::new(&entry.name).fg(TableColor::Green),
            Cell::new(entry.account.to_string()).fg(TableColor::White),
            Cell::new(&entry.created_at).fg(TableColor::Grey),
        ]);
    }
    println!("{}", table);
}

fn run_book(config: &Config, command: BookCommands) -> Result<(), Box<dyn std::error::Error>> {
    let path = config.addressbook_path();
    let book = AddressBook::load(&path)?;
    match command {
        BookCommands::Add {
            label,
            account,
            notes,
        } => {
            let account = AccountId::from_hex(&account)?;
            book.add(&label, account, notes)?;
            book.save(&path)?;
            println!("{} {} → {}", "✓ Added".bright_green(), label.bright_white(), account.short());
        }
        BookCommands::List { search } => {
            let entries = match search {
                Some(query) => book.search(&query),
                None => book.list(),
            };
            if entries.is_empty() {
                println!("{}", "No matching addresses.".yellow());
                return Ok(());
            }
            let mut table = new_table(&["Label", "Account", "Notes", "Updated"]);
            for entry in entries {
                table.add_row(vec![
                    Cell::new(&entry.label).fg(TableColor::Green),
                    Cell::new(entry.account.to_string()).fg(TableColor::White),
                    Cell::new(entry.notes.unwrap_or_default()).fg(TableColor::Grey),
                    Cell::new(&entry.updated_at).fg(TableColor::Grey),
                ]);
            }
            println!("{}", table);
        }
        BookCommands::Remove { label } => {
            let entry = book.remove(&label)?;
            book.save(&path)?;
            println!("{} {}", "✓ Removed".bright_green(), entry.label);
        }
        BookCommands::Export { path: out } => {
            book.export_csv(&out)?;
            println!("{} {} entries to {}", "✓ Exported".bright_green(), book.len(), out.display());
        }
    }
    Ok(())
}

fn run_keys(config: &Config, command: Commands) -> Result<(), Box<dyn std::error::Error>> {
    let secrets = SecretStore::open(&config.keys_path())?;
    match command {
        Commands::Generate { name } => {
            let phrase = generate_mnemonic()?;
            let account = secrets.submit(&phrase, &name)?;
            println!("{} {}", "✓ Created key".bright_green(), name.bright_white());
            println!("  account: {}", account.to_string().bright_cyan());
            println!("  phrase:  {}", phrase.yellow());
            println!("{}", "Write the phrase down; it is the only way to restore this key.".dimmed());
        }
        Commands::Add { name, phrase } => {
            let account = KeyPair::from_phrase(&phrase)?.account();
            secrets.submit(&phrase, &name)?;
            println!("{} {} ({})", "✓ Stored".bright_green(), name.bright_white(), account.short());
        }
        Commands::List => list_keys(&secrets),
        Commands::Forget { name } => {
            let entry = secrets.forget(&name)?;
            println!("{} {} ({})", "✓ Forgot".bright_green(), entry.name, entry.account.short());
        }
        Commands::Book(command) => run_book(config, command)?,
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let mut config = load_config(&cli.config)?;
    if let Some(dir) = cli.data_dir {
        config.storage.data_dir = dir;
    }
    std::fs::create_dir_all(&config.storage.data_dir)?;

    match cli.command {
        Commands::Book(command) => run_book(&config, command),
        command => run_keys(&config, command),
    }
}
