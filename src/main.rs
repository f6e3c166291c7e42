use clap::{Parser, Subcommand};
use postchain::config::{self, Settings};
use postchain::images::LocalClock;
use postchain::{output, pipeline};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "postchain")]
#[command(about = "Link a tree of markdown posts: order, images, prev/next, index")]
#[command(long_about = "\
Link a tree of markdown posts: order, images, prev/next, index

Every directory listed in config.xml is processed in two passes. Pass one
rewrites each post: the first-line heading becomes its title, `addimage N`
lines are replaced by links to screenshots moved into ../images/, and old
navigation footers are cut off. Pass two appends fresh previous/next links.
Then the directory's README.md index is written.

Posts are ordered by numeric prefix:

  posts/
  ├── 1_install.md      # first
  ├── 2_setup.md
  ├── 10_deploy.md      # after 2_, not after 1_
  ├── notes.md          # unprefixed posts come last
  └── README.md         # generated index (never treated as a post)

Run without a subcommand to process everything. Set RUST_LOG=debug for
per-file detail.")]
#[command(version)]
struct Cli {
    /// Directory that the config file and include_dir paths are relative to
    #[arg(long, default_value = ".", global = true)]
    root: PathBuf,

    /// Config file, relative to --root unless absolute
    #[arg(long, default_value = config::DEFAULT_CONFIG_FILE, global = true)]
    config: PathBuf,

    /// Print reports as JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Clone, Copy)]
enum Command {
    /// Rewrite, link and index every configured directory (default)
    Run,
    /// Show processing order, titles and image moves without changing anything
    Check,
    /// Print a stock config.xml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => {
            let settings = load_settings(&cli)?;
            let report = pipeline::run(&cli.root, &settings, &LocalClock)?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                output::print_run_output(&report);
            }
            if report.has_directory_errors() {
                return Err("one or more directories could not be indexed".into());
            }
        }
        Command::Check => {
            let settings = load_settings(&cli)?;
            let plans = pipeline::plan(&cli.root, &settings, &LocalClock)?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&plans)?);
            } else {
                output::print_plan_output(&plans);
            }
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_xml());
        }
    }

    Ok(())
}

/// Log to stderr, filtered by `RUST_LOG`. Stdout carries the report.
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("warn,postchain=info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn load_settings(cli: &Cli) -> Result<Settings, config::ConfigError> {
    let path = cli.root.join(&cli.config);
    tracing::debug!(config = %path.display(), "loading config");
    config::load_settings(&path)
}
