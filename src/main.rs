use anyhow::Result;
use clap::{Parser, Subcommand};
use modkeeper::config::Paths;
use modkeeper::{App, Config};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "modkeeper")]
#[command(
    author,
    version = modkeeper::APP_VERSION,
    about = "Load order, activation and grouping manager for game mod collections"
)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Profile to work on instead of the configured one
    #[arg(short, long, global = true)]
    profile: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replace the profile's collection with items from a JSON file
    Import { path: String },

    /// List the collection as it would be displayed
    List {
        /// Search text; `C: <category> - <term>` searches one category
        #[arg(long)]
        search: Option<String>,
        /// Activation filter: all, active, passive
        #[arg(long)]
        filter: Option<String>,
        /// Sort mode for this listing: load_order, title, category, version
        #[arg(long)]
        sort: Option<String>,
    },

    /// Activate or deactivate a mod
    Toggle {
        mod_id: String,
        /// Deactivate instead of activate
        #[arg(long)]
        off: bool,
        /// Apply dependency changes without asking
        #[arg(long, conflicts_with_all = ["confirm", "only"])]
        yes: bool,
        /// Stop and report when dependencies would change
        #[arg(long, conflicts_with = "only")]
        confirm: bool,
        /// Toggle only this mod, leaving dependencies alone
        #[arg(long)]
        only: bool,
    },

    /// Toggle every mod under a separator
    Group { separator: String },

    /// Move an item onto the position of another
    Move {
        active: String,
        over: String,
        /// Additional selected items that move together with `active`
        #[arg(long, num_args = 1..)]
        select: Vec<String>,
    },

    /// Collapse or expand a separator
    Collapse { separator: String },

    /// Manage separators
    Separator {
        #[command(subcommand)]
        action: SeparatorCommands,
    },

    /// Remove a mod or separator from the profile
    Remove { identifier: String },

    /// Set or clear a mod's category
    Category {
        mod_id: String,
        /// Category name; omit to clear
        category: Option<String>,
    },

    /// List stored profiles
    Profiles,

    /// Show or change configuration
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },

    /// Show current status
    Status,
}

#[derive(Subcommand)]
enum SeparatorCommands {
    /// Add a separator
    Add {
        title: String,
        /// Index to insert at (0-based); appended when omitted
        #[arg(long)]
        at: Option<usize>,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Print the configuration
    Show,
    /// Change a setting
    Set { key: String, value: String },
}

fn setup_logging(verbosity: u8, also_stderr: bool) {
    let filter = match verbosity {
        0 => "modkeeper=info",
        1 => "modkeeper=debug",
        2 => "modkeeper=trace",
        _ => "trace",
    };

    let paths = Paths::new();
    let log_file = paths.log_file();
    if let Some(parent) = log_file.parent() {
        std::fs::create_dir_all(parent).ok();
    }

    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)
        .expect("Failed to open log file");

    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into());
    let file_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::sync::Arc::new(file));

    if also_stderr {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(file_layer)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(file_layer)
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose, cli.verbose > 0);

    // Load configuration
    let config = Config::load().await?;

    // Initialize app
    let mut app = App::new(config).await?;
    app.set_profile_override(cli.profile);

    match cli.command {
        Commands::Import { path } => app.cmd_import(&path).await?,
        Commands::List {
            search,
            filter,
            sort,
        } => {
            app.cmd_list(search.as_deref(), filter.as_deref(), sort.as_deref())
                .await?
        }
        Commands::Toggle {
            mod_id,
            off,
            yes,
            confirm,
            only,
        } => app.cmd_toggle(&mod_id, off, yes, confirm, only).await?,
        Commands::Group { separator } => app.cmd_group(&separator).await?,
        Commands::Move {
            active,
            over,
            select,
        } => app.cmd_move(&active, &over, &select).await?,
        Commands::Collapse { separator } => app.cmd_collapse(&separator).await?,
        Commands::Separator { action } => match action {
            SeparatorCommands::Add { title, at } => app.cmd_separator_add(&title, at).await?,
        },
        Commands::Remove { identifier } => app.cmd_remove(&identifier).await?,
        Commands::Category { mod_id, category } => {
            app.cmd_category(&mod_id, category.as_deref()).await?
        }
        Commands::Profiles => app.cmd_profiles().await?,
        Commands::Config { action } => match action {
            ConfigCommands::Show => app.cmd_config_show().await?,
            ConfigCommands::Set { key, value } => app.cmd_config_set(&key, &value).await?,
        },
        Commands::Status => app.cmd_status().await?,
    }

    Ok(())
}
