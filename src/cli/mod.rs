use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::application::{AssetLedgerService, ServiceConfig};
use crate::context::{TransactionContext, TransientMap};
use crate::domain::{Asset, DEFAULT_PRIVATE_COLLECTION};
use crate::storage::{LedgerTransaction, Repository};

/// Asset Ledger - per-transaction asset lifecycle over a versioned store
#[derive(Parser)]
#[command(name = "asset-ledger")]
#[command(about = "Create, read, update and delete assets in public and private ledger partitions")]
#[command(version)]
pub struct Cli {
    /// Database file path
    #[arg(short, long, env = "ASSET_LEDGER_DB", default_value = "assets.db")]
    pub database: String,

    /// Private data collection backing the private partition
    #[arg(long, env = "ASSET_LEDGER_COLLECTION", default_value = DEFAULT_PRIVATE_COLLECTION)]
    pub collection: String,

    /// Transient entry that carries private values (omit to require exactly one entry)
    #[arg(long, env = "ASSET_LEDGER_TRANSIENT_KEY")]
    pub transient_key: Option<String>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database
    Init,

    /// Show the id an asset created in a new transaction would receive
    Id,

    /// Check whether a public asset exists
    Exists {
        /// Asset ID
        id: String,
    },

    /// Create a public asset
    Create {
        /// Asset value
        value: String,
    },

    /// Show a public asset
    Read {
        /// Asset ID
        id: String,
    },

    /// Replace the value of a public asset
    Update {
        /// Asset ID
        id: String,

        /// New value
        value: String,
    },

    /// Delete a public asset
    Delete {
        /// Asset ID
        id: String,
    },

    /// Private asset commands (values are passed as transient data)
    #[command(subcommand)]
    Private(PrivateCommands),
}

#[derive(Subcommand)]
pub enum PrivateCommands {
    /// Check whether a private asset exists
    Exists {
        /// Asset ID
        id: String,
    },

    /// Create a private asset from transient data
    Create {
        /// Transient entry (KEY=VALUE), repeatable
        #[arg(short, long = "transient", value_parser = parse_transient_entry)]
        transient: Vec<(String, Vec<u8>)>,
    },

    /// Show a private asset
    Read {
        /// Asset ID
        id: String,
    },

    /// Replace the value of a private asset from transient data
    Update {
        /// Asset ID
        id: String,

        /// Transient entry (KEY=VALUE), repeatable
        #[arg(short, long = "transient", value_parser = parse_transient_entry)]
        transient: Vec<(String, Vec<u8>)>,
    },

    /// Delete a private asset
    Delete {
        /// Asset ID
        id: String,
    },
}

impl Cli {
    fn service(&self) -> AssetLedgerService {
        AssetLedgerService::new(ServiceConfig {
            private_collection: self.collection.clone(),
            transient_key: self.transient_key.clone(),
        })
    }

    pub async fn run(self) -> Result<()> {
        let service = self.service();
        let url = database_url(&self.database, false);

        match self.command {
            Commands::Init => {
                Repository::init(&database_url(&self.database, true)).await?;
                println!("Database initialized: {}", self.database);
            }

            Commands::Id => {
                let repo = Repository::connect(&url).await?;
                let txn = LedgerTransaction::begin(&repo, TransientMap::new());
                println!("{}", service.generate_id(&txn));
            }

            Commands::Exists { id } => {
                let repo = Repository::connect(&url).await?;
                let txn = LedgerTransaction::begin(&repo, TransientMap::new());
                println!("{}", service.exists(&txn, &id).await?);
            }

            Commands::Create { value } => {
                let repo = Repository::connect(&url).await?;
                let mut txn = LedgerTransaction::begin(&repo, TransientMap::new());
                let id = service.create(&mut txn, value).await?;
                commit(txn).await?;
                println!("Created asset: {}", id);
            }

            Commands::Read { id } => {
                let repo = Repository::connect(&url).await?;
                let txn = LedgerTransaction::begin(&repo, TransientMap::new());
                let asset = service.read(&txn, &id).await?;
                print_asset(&asset)?;
            }

            Commands::Update { id, value } => {
                let repo = Repository::connect(&url).await?;
                let mut txn = LedgerTransaction::begin(&repo, TransientMap::new());
                let id = service.update(&mut txn, &id, value).await?;
                commit(txn).await?;
                println!("Updated asset: {}", id);
            }

            Commands::Delete { id } => {
                let repo = Repository::connect(&url).await?;
                let mut txn = LedgerTransaction::begin(&repo, TransientMap::new());
                let id = service.delete(&mut txn, &id).await?;
                commit(txn).await?;
                println!("Deleted asset: {}", id);
            }

            Commands::Private(private_cmd) => {
                let repo = Repository::connect(&url).await?;
                run_private_command(&service, &repo, private_cmd).await?;
            }
        }

        Ok(())
    }
}

async fn run_private_command(
    service: &AssetLedgerService,
    repo: &Repository,
    cmd: PrivateCommands,
) -> Result<()> {
    match cmd {
        PrivateCommands::Exists { id } => {
            let txn = LedgerTransaction::begin(repo, TransientMap::new());
            println!("{}", service.exists_private(&txn, &id).await?);
        }

        PrivateCommands::Create { transient } => {
            let mut txn = LedgerTransaction::begin(repo, transient.into_iter().collect());
            let id = service.create_private(&mut txn).await?;
            commit(txn).await?;
            println!(
                "Created private asset: {} ({})",
                id,
                service.private_partition()
            );
        }

        PrivateCommands::Read { id } => {
            let txn = LedgerTransaction::begin(repo, TransientMap::new());
            let asset = service.read_private(&txn, &id).await?;
            print_asset(&asset)?;
        }

        PrivateCommands::Update { id, transient } => {
            let mut txn = LedgerTransaction::begin(repo, transient.into_iter().collect());
            let id = service.update_private(&mut txn, &id).await?;
            commit(txn).await?;
            println!("Updated private asset: {}", id);
        }

        PrivateCommands::Delete { id } => {
            let mut txn = LedgerTransaction::begin(repo, TransientMap::new());
            service.delete_private(&mut txn, &id).await?;
            commit(txn).await?;
            println!("Deleted private asset: {}", id);
        }
    }
    Ok(())
}

async fn commit(txn: LedgerTransaction<'_>) -> Result<()> {
    let tx_id = txn.tx_id().to_string();
    txn.commit()
        .await
        .with_context(|| format!("Transaction {} was not committed", tx_id))?;
    Ok(())
}

fn print_asset(asset: &Asset) -> Result<()> {
    let json = serde_json::to_string(asset).context("Failed to format asset")?;
    println!("{}", json);
    Ok(())
}

fn database_url(path: &str, create: bool) -> String {
    if create {
        format!("sqlite:{}?mode=rwc", path)
    } else {
        format!("sqlite:{}", path)
    }
}

/// Parse a `KEY=VALUE` transient entry. The value may be empty.
pub fn parse_transient_entry(s: &str) -> Result<(String, Vec<u8>), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("invalid transient entry '{}': expected KEY=VALUE", s))?;
    if key.is_empty() {
        return Err(format!("invalid transient entry '{}': empty key", s));
    }
    Ok((key.to_string(), value.as_bytes().to_vec()))
}
