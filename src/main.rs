use anyhow::Result;
use clap::Parser;
use hangar::commands::{self, Config};
use std::path::PathBuf;

/// hangar - versioned package store with host compatibility checks
///
/// Installs package archives into a local store, keeps a cache of archives
/// and resolves queries such as "abc >=1.0.0,<2.0.0" to the newest version
/// the host application can use.
///
/// Examples:
///   hangar build ./abc                    # Pack ./abc into ./abc/dist/abc-<version>.tar.gz
///   hangar install ./abc-1.2.0.tar.gz     # Install from an archive
///   hangar cache add ./abc-1.2.0.tar.gz   # Cache an archive for later
///   hangar install "abc >=1.0.0"          # Install the best cached match
///   hangar list --all                     # Include incompatible packages
#[derive(Parser, Debug)]
#[command(author, version = env!("HANGAR_VERSION"), about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Data root directory (defaults to ~/.hangar; also via HANGAR_ROOT)
    #[arg(
        long = "root",
        short = 'r',
        env = "HANGAR_ROOT",
        value_name = "PATH",
        global = true
    )]
    pub root: Option<PathBuf>,

    /// Name of the host application packages are checked against
    #[arg(long, env = "HANGAR_APP_NAME", value_name = "NAME", global = true)]
    pub app_name: Option<String>,

    /// Version of the host application (semver)
    #[arg(long, env = "HANGAR_APP_VERSION", value_name = "VERSION", global = true)]
    pub app_version: Option<String>,

    /// Enable debug logging
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Pack a package directory (with meta.json) into a .tar.gz archive
    Build(BuildArgs),

    /// List installed packages
    List(ListArgs),

    /// Show the installed package that best matches a query
    Find(QueryArgs),

    /// Install a package archive, or the best cached match for a query
    Install(InstallArgs),

    /// Remove installed packages matching a query
    Remove(QueryArgs),

    /// Remove all installed packages usable by the host
    Purge,

    /// Manage the package archive cache
    #[command(subcommand)]
    Cache(CacheCommands),
}

#[derive(clap::Subcommand, Debug)]
enum CacheCommands {
    /// List cached packages
    List(ListArgs),

    /// Add a package archive to the cache
    Add(ArchiveArgs),

    /// Remove all cached packages usable by the host
    Purge,
}

#[derive(clap::Args, Debug)]
pub struct BuildArgs {
    /// Package directory containing meta.json
    #[arg(value_name = "DIR")]
    pub dir: PathBuf,

    /// Output directory (defaults to DIR/dist)
    #[arg(long, short = 'o', value_name = "PATH")]
    pub output: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Optional query, e.g. "abc" or "abc >=1.0.0"
    #[arg(value_name = "QUERY")]
    pub query: Option<String>,

    /// Also show packages the host cannot use
    #[arg(long, short = 'a')]
    pub all: bool,
}

#[derive(clap::Args, Debug)]
pub struct QueryArgs {
    /// Package query, e.g. "abc" or "abc >=1.0.0,<2.0.0"
    #[arg(value_name = "QUERY")]
    pub query: String,
}

#[derive(clap::Args, Debug)]
pub struct InstallArgs {
    /// Path to a .tar.gz/.tgz/.zip archive, or a query against the cache
    #[arg(value_name = "ARCHIVE|QUERY")]
    pub target: String,
}

#[derive(clap::Args, Debug)]
pub struct ArchiveArgs {
    /// Path to a .tar.gz/.tgz/.zip archive
    #[arg(value_name = "ARCHIVE")]
    pub archive: PathBuf,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let default_filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let runtime = hangar::runtime::RealRuntime;
    let config = Config::new(&runtime, cli.root, cli.app_name, cli.app_version)?;

    match cli.command {
        Commands::Build(args) => commands::build(runtime, &args.dir, args.output)?,
        Commands::List(args) => commands::list(runtime, args.query.as_deref(), args.all, config)?,
        Commands::Find(args) => commands::find(runtime, &args.query, config)?,
        Commands::Install(args) => commands::install(runtime, &args.target, config)?,
        Commands::Remove(args) => commands::remove(runtime, &args.query, config)?,
        Commands::Purge => commands::purge(runtime, config)?,
        Commands::Cache(CacheCommands::List(args)) => {
            commands::cache_list(runtime, args.query.as_deref(), args.all, config)?
        }
        Commands::Cache(CacheCommands::Add(args)) => {
            commands::cache_add(runtime, &args.archive, config)?
        }
        Commands::Cache(CacheCommands::Purge) => commands::cache_purge(runtime, config)?,
    }
    Ok(())
}
