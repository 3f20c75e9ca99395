//! Command-line interface for the merge pipeline.

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{debug, info, warn};

use message_merge::backup::{AddressBook, MessageStore};
use message_merge::config::AppConfig;
use message_merge::logging::init_logging;
use message_merge::merge::{ContactIndex, MergeEngine};
use message_merge::metrics::MetricsCollector;
use message_merge::models::{DuplicatePolicy, MergeOptions};
use message_merge::normalize::IdentifierNormalizer;
use message_merge::sources::ContactDirectory;
use message_merge::validation::InputValidator;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge backup messages with address book contacts
    Merge {
        /// Path to the message store inside the backup
        #[arg(short, long)]
        message_db: Option<PathBuf>,

        /// Path to the address book store inside the backup
        #[arg(short, long)]
        address_db: Option<PathBuf>,

        /// Identifier of the backup owner
        #[arg(short, long)]
        owner: Option<String>,

        /// Duplicate handling for the contact index (keep-first, keep-last, reject)
        #[arg(short, long)]
        policy: Option<String>,
    },
    /// Index the address book and report the resolved entries
    Contacts {
        /// Path to the address book store inside the backup
        #[arg(short, long)]
        address_db: Option<PathBuf>,

        /// Duplicate handling for the contact index (keep-first, keep-last, reject)
        #[arg(short, long)]
        policy: Option<String>,
    },
}

fn main() -> Result<()> {
    // Load configuration
    let config = AppConfig::load()?;

    // Initialize logging and metrics
    let _guard = init_logging(
        Some(&config.get_log_level()),
        config.logging.file_path.as_deref().map(Path::new),
        config.logging.format == "json",
    )?;
    MetricsCollector::init()?;

    info!("Starting message-merge");

    let cli = Cli::parse();
    match cli.command {
        Commands::Merge {
            message_db,
            address_db,
            owner,
            policy,
        } => merge_backup(&config, message_db, address_db, owner, policy),
        Commands::Contacts { address_db, policy } => index_contacts(&config, address_db, policy),
    }
}

/// Run the full merge pipeline over a backup pair and report the outcome.
fn merge_backup(
    config: &AppConfig,
    message_db: Option<PathBuf>,
    address_db: Option<PathBuf>,
    owner: Option<String>,
    policy: Option<String>,
) -> Result<()> {
    let message_db = message_db.unwrap_or_else(|| PathBuf::from(&config.backup.message_db));
    let address_db = address_db.unwrap_or_else(|| PathBuf::from(&config.backup.address_db));
    InputValidator::validate_backup_path(&message_db)?;
    InputValidator::validate_backup_path(&address_db)?;

    let owner = owner.unwrap_or_else(|| config.merge.owner.clone());
    InputValidator::validate_owner_identifier(&owner)?;
    let policy = resolve_policy(config, policy)?;

    info!(
        message_db = %message_db.display(),
        address_db = %address_db.display(),
        "opening backup stores"
    );
    let store = MessageStore::open(&message_db)?;
    let book = AddressBook::open(&address_db)?;

    let engine = MergeEngine::new(MergeOptions { owner, policy })?;
    let output = engine.run(&store, &store, &book)?;

    info!(
        messages = output.messages.len(),
        contacts = output.contacts.len(),
        "merge complete"
    );
    if output.report.duplicate_rows_dropped > 0 {
        warn!(
            dropped = output.report.duplicate_rows_dropped,
            "source contained duplicate join rows"
        );
    }
    info!(report = %serde_json::to_string(&output.report)?, "data quality report");

    Ok(())
}

/// Index the address book on its own and report the resolved entries.
fn index_contacts(
    config: &AppConfig,
    address_db: Option<PathBuf>,
    policy: Option<String>,
) -> Result<()> {
    let address_db = address_db.unwrap_or_else(|| PathBuf::from(&config.backup.address_db));
    InputValidator::validate_backup_path(&address_db)?;
    let policy = resolve_policy(config, policy)?;

    let book = AddressBook::open(&address_db)?;
    let normalizer = IdentifierNormalizer::new()?;
    let index = ContactIndex::build(book.contacts()?, &normalizer, policy)?;

    info!(
        contacts = index.len(),
        collisions = index.collisions(),
        "address book indexed"
    );
    for record in index.records() {
        debug!(
            full_name = %record.full_name(),
            identifier = %record.identifier,
            "address book entry"
        );
    }

    Ok(())
}

/// Pick the duplicate policy from the command line or fall back to config.
fn resolve_policy(config: &AppConfig, policy: Option<String>) -> Result<DuplicatePolicy> {
    match policy {
        Some(name) => {
            InputValidator::validate_duplicate_policy(&name)?;
            Ok(name.parse()?)
        }
        None => config.duplicate_policy(),
    }
}
