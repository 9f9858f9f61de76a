mod commands;
mod error;

use std::path::PathBuf;

use structopt::clap::AppSettings::*;
use structopt::StructOpt;
use tracing::Level;

#[derive(Debug, StructOpt)]
enum Commands {
    #[structopt(name = "info", about = "Show the header of a package or repository")]
    Info {
        #[structopt(
            name = "file",
            parse(from_os_str),
            help = "Path to the .hpkg or .hpkr file"
        )]
        path: PathBuf,
    },

    #[structopt(name = "pkg", about = "Show package metadata")]
    Pkg {
        #[structopt(long, help = "Print the packages as JSON")]
        json: bool,

        #[structopt(
            name = "file",
            parse(from_os_str),
            help = "Path to the .hpkg or .hpkr file"
        )]
        path: PathBuf,
    },

    #[structopt(name = "dump", about = "Print the raw attribute tree")]
    Dump {
        #[structopt(long, help = "Dump the table of contents instead of the package attributes")]
        toc: bool,

        #[structopt(
            name = "file",
            parse(from_os_str),
            help = "Path to the .hpkg or .hpkr file"
        )]
        path: PathBuf,
    },

    #[structopt(name = "l", visible_alias = "list", about = "List files of a package")]
    List {
        #[structopt(name = "file", parse(from_os_str), help = "Path to the .hpkg file")]
        path: PathBuf,
    },

    #[structopt(
        name = "x",
        visible_alias = "extract",
        about = "Extract files from a package"
    )]
    Extract {
        #[structopt(name = "file", parse(from_os_str), help = "Path to the .hpkg file")]
        path: PathBuf,

        #[structopt(
            name = "dest",
            parse(from_os_str),
            default_value = ".",
            help = "Directory to extract into"
        )]
        dest: PathBuf,
    },
}

#[derive(Debug, StructOpt)]
#[structopt(
    name = "hpkg",
    about = "Inspect and extract Haiku packages and package repositories.",
    settings = &[SubcommandRequiredElseHelp, DisableHelpSubcommand, VersionlessSubcommands],
)]
struct CliOpts {
    #[structopt(
        short,
        long,
        parse(from_occurrences),
        help = "Show verbose output; repeat for more",
        global = true
    )]
    verbose: u8,

    #[structopt(subcommand)]
    cmd: Commands,
}

fn run(cmd: Commands) -> anyhow::Result<()> {
    match cmd {
        Commands::Info { path } => commands::info(&path)?,
        Commands::Pkg { path, json } => commands::pkg(&path, json)?,
        Commands::Dump { path, toc } => commands::dump(&path, toc)?,
        Commands::List { path } => commands::list(&path)?,
        Commands::Extract { path, dest } => commands::extract(&path, &dest)?,
    }
    Ok(())
}

fn main() {
    let opts = CliOpts::from_iter(wild::args_os());

    let level = match opts.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(opts.cmd) {
        eprintln!("Error: {:?}", e);
        std::process::exit(1);
    }
}
