//! DocVault CLI
//!
//! Command-line tools for backup-protected bulk writes.
//!
//! # Commands
//!
//! - `config` - Show or update stored credentials
//! - `init` - Create a local file cluster
//! - `verify` - Check the connection, database and collection
//! - `create` - Create a collection
//! - `insert` - Append documents from a JSON file
//! - `replace` - Replace a collection's documents with a JSON file
//! - `read` - Query documents

mod commands;

use clap::{Parser, Subcommand};
use commands::{Backend, Context, OutputFormat};
use docvault_core::CredentialSet;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// DocVault command-line tools.
#[derive(Parser)]
#[command(name = "docvault")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the config file
    #[arg(global = true, long, env = "DOCVAULT_CONFIG")]
    config: Option<PathBuf>,

    /// Root directory of local file clusters
    #[arg(global = true, long, env = "DOCVAULT_STORE_DIR")]
    store_dir: Option<PathBuf>,

    /// Store backend
    #[arg(global = true, long, value_enum, default_value_t = Backend::File)]
    backend: Backend,

    /// User to authenticate as (overrides the config file)
    #[arg(global = true, long, env = "DOCVAULT_USERNAME")]
    username: Option<String>,

    /// Password (overrides the config file)
    #[arg(global = true, long, env = "DOCVAULT_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Cluster to connect to (overrides the config file)
    #[arg(global = true, long, env = "DOCVAULT_CLUSTER")]
    cluster: Option<String>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show or update stored credentials
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Create the local file cluster named by --cluster or the config file
    Init,

    /// Check the connection, and optionally a database and collection
    Verify {
        /// Database to check
        #[arg(short, long)]
        database: Option<String>,

        /// Collection to check (requires --database)
        #[arg(short, long, requires = "database")]
        collection: Option<String>,
    },

    /// Create a collection if it does not exist
    Create {
        /// Database name
        #[arg(short, long)]
        database: String,

        /// Collection name
        #[arg(short, long)]
        collection: String,
    },

    /// Append documents from a JSON file
    Insert(WriteArgs),

    /// Replace every document with those from a JSON file
    Replace(WriteArgs),

    /// Query documents
    Read {
        /// Database name
        #[arg(short, long)]
        database: String,

        /// Collection name
        #[arg(short, long)]
        collection: String,

        /// Equality filter as a JSON object
        #[arg(long)]
        filter: Option<String>,

        /// Fields to return, comma separated
        #[arg(long, value_delimiter = ',')]
        fields: Option<Vec<String>>,

        /// Include the _id field
        #[arg(long)]
        include_id: bool,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
    },

    /// Show version information
    Version,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Store credentials; fields not given keep their stored value
    Set {
        /// User to authenticate as
        #[arg(long)]
        username: Option<String>,

        /// Password
        #[arg(long)]
        password: Option<String>,

        /// Cluster to connect to
        #[arg(long)]
        cluster: Option<String>,
    },

    /// Print the stored credentials
    Show,
}

#[derive(clap::Args)]
struct WriteArgs {
    /// Database name
    #[arg(short, long)]
    database: String,

    /// Collection name
    #[arg(short, long)]
    collection: String,

    /// JSON file holding an array of objects
    #[arg(short, long)]
    file: PathBuf,

    /// Keep the backup collection after the write
    #[arg(long)]
    preserve_backup: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let explicit = CredentialSet {
        username: cli.username,
        password: cli.password,
        cluster: cli.cluster,
    };
    let ctx = Context::new(cli.config, cli.store_dir, cli.backend, explicit)?;

    match cli.command {
        Commands::Config { action } => match action {
            ConfigAction::Set {
                username,
                password,
                cluster,
            } => {
                let updates = CredentialSet {
                    username,
                    password,
                    cluster,
                };
                commands::config::set(&ctx, &updates)?;
            }
            ConfigAction::Show => commands::config::show(&ctx)?,
        },
        Commands::Init => commands::create::init(&ctx)?,
        Commands::Verify {
            database,
            collection,
        } => commands::verify::run(&ctx, database, collection)?,
        Commands::Create {
            database,
            collection,
        } => commands::create::run(&ctx, &database, &collection)?,
        Commands::Insert(args) => commands::write::run(
            &ctx,
            &args.database,
            &args.collection,
            &args.file,
            docvault_core::WriteMode::Append,
            args.preserve_backup,
        )?,
        Commands::Replace(args) => commands::write::run(
            &ctx,
            &args.database,
            &args.collection,
            &args.file,
            docvault_core::WriteMode::ReplaceAll,
            args.preserve_backup,
        )?,
        Commands::Read {
            database,
            collection,
            filter,
            fields,
            include_id,
            format,
        } => commands::read::run(
            &ctx,
            &database,
            &collection,
            filter.as_deref(),
            fields,
            include_id,
            format,
        )?,
        Commands::Version => {
            println!("DocVault CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("DocVault Core v{}", docvault_core::VERSION);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_insert_with_globals() {
        let cli = Cli::try_parse_from([
            "docvault",
            "--cluster",
            "c0",
            "insert",
            "-d",
            "shop",
            "-c",
            "orders",
            "--file",
            "batch.json",
            "--preserve-backup",
        ])
        .unwrap();
        assert_eq!(cli.cluster.as_deref(), Some("c0"));
        match cli.command {
            Commands::Insert(args) => {
                assert_eq!(args.database, "shop");
                assert!(args.preserve_backup);
            }
            _ => panic!("expected insert"),
        }
    }

    #[test]
    fn parses_read_field_list() {
        let cli = Cli::try_parse_from([
            "docvault", "read", "-d", "db", "-c", "c", "--fields", "a,b", "--format", "table",
        ])
        .unwrap();
        match cli.command {
            Commands::Read { fields, format, .. } => {
                assert_eq!(fields, Some(vec!["a".to_string(), "b".to_string()]));
                assert_eq!(format, OutputFormat::Table);
            }
            _ => panic!("expected read"),
        }
    }

    #[test]
    fn collection_requires_database_for_verify() {
        assert!(Cli::try_parse_from(["docvault", "verify", "-c", "orders"]).is_err());
    }
}
