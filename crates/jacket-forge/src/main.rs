use camino::Utf8PathBuf;
use clap::builder::{styling::AnsiColor, Styles};
use clap::ColorChoice;
use clap::{CommandFactory, FromArgMatches, Parser, Subcommand};
use commands::{
    allocate_ids, build_jackets, init_config, inspect_package, register_ids, show_config,
    AllocateArgs, BuildArgs, InspectArgs, RegisterArgs,
};
use miette::Result;

mod commands;
mod errors;
mod utils;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// The path to the forge.toml config file
    #[arg(short, long, global = true)]
    config: Option<Utf8PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build jacket bundles for every item folder in the inputs directory
    Build {
        /// Directory holding the template bundles
        #[arg(long)]
        template_dir: Option<Utf8PathBuf>,

        /// Id baked into the template bundles
        #[arg(long)]
        template_id: Option<u32>,

        /// Directory with one folder per item
        #[arg(short, long)]
        inputs: Option<Utf8PathBuf>,

        /// Directory to write the bundles to
        #[arg(short, long)]
        output: Option<Utf8PathBuf>,

        /// The identifier table file
        #[arg(long)]
        id_table: Option<Utf8PathBuf>,

        /// The dependency manifest to extend
        #[arg(long)]
        manifest: Option<Utf8PathBuf>,

        /// Lowest id handed out to new keys
        #[arg(long)]
        id_floor: Option<u32>,

        /// Number of worker threads
        #[arg(short, long)]
        jobs: Option<usize>,

        /// Rebuild items whose bundles already exist
        #[arg(long)]
        force: bool,

        /// Write a JSON report of the run to this path
        #[arg(long)]
        report: Option<Utf8PathBuf>,
    },
    /// Resolve ids for keys, or list the identifier table
    Allocate {
        /// Keys to resolve; lists every record when empty
        keys: Vec<String>,

        /// The identifier table file
        #[arg(long)]
        id_table: Option<Utf8PathBuf>,

        /// Lowest id handed out to new keys
        #[arg(long)]
        id_floor: Option<u32>,
    },
    /// Register ids in the dependency manifest
    Register {
        #[arg(required = true)]
        ids: Vec<u32>,

        /// The dependency manifest to extend
        #[arg(long)]
        manifest: Option<Utf8PathBuf>,
    },
    /// Show information about a package
    Inspect {
        /// The path to the package file
        #[arg(short, long)]
        file_path: Utf8PathBuf,

        /// Dump every object tree as JSON
        #[arg(long)]
        trees: bool,
    },
    /// Show or create the forge.toml configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Write a forge.toml with the default values
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn parse_args() -> Args {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default().bold())
        .usage(AnsiColor::Green.on_default().bold())
        .literal(AnsiColor::Cyan.on_default())
        .placeholder(AnsiColor::Blue.on_default());

    let matches = Args::command()
        .styles(styles)
        .color(ColorChoice::Auto)
        .get_matches();

    Args::from_arg_matches(&matches).unwrap_or_else(|e| e.exit())
}

fn main() -> Result<()> {
    let args = parse_args();
    utils::logging::init_logging(args.verbose);

    let config_path = args.config;
    match args.command {
        Commands::Build {
            template_dir,
            template_id,
            inputs,
            output,
            id_table,
            manifest,
            id_floor,
            jobs,
            force,
            report,
        } => build_jackets(BuildArgs {
            config_path,
            template_dir,
            template_id,
            inputs_dir: inputs,
            output_dir: output,
            id_table,
            manifest,
            id_floor,
            jobs,
            force,
            report,
        }),
        Commands::Allocate {
            keys,
            id_table,
            id_floor,
        } => allocate_ids(AllocateArgs {
            config_path,
            keys,
            id_table,
            id_floor,
        }),
        Commands::Register { ids, manifest } => register_ids(RegisterArgs {
            config_path,
            ids,
            manifest,
        }),
        Commands::Inspect { file_path, trees } => {
            inspect_package(InspectArgs { file_path, trees })
        }
        Commands::Config { action } => match action {
            ConfigAction::Show => show_config(config_path),
            ConfigAction::Init { force } => init_config(config_path, force),
        },
    }
}
