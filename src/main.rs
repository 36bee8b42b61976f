use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tailgate_lib::agent::LogKind;
use tailgate_lib::commands;
use tailgate_lib::commands::logs::{LogSource, LogsOptions};
use tracing_subscriber::EnvFilter;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "tailgate")]
#[command(about = "Show the tail of local files or remote task log streams")]
#[command(version = VERSION)]
struct Cli {
    /// Agent HTTP address (overrides TAILGATE_ADDR and config files)
    #[arg(long, global = true)]
    address: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the last lines of a file, stdin, or a task's log stream
    Logs {
        /// File to read; omit or pass `-` for stdin
        #[arg(conflicts_with = "alloc")]
        path: Option<PathBuf>,
        /// Allocation whose task logs to stream from the agent
        #[arg(long, requires = "task")]
        alloc: Option<String>,
        /// Task within the allocation
        #[arg(long, requires = "alloc")]
        task: Option<String>,
        /// Stream stderr instead of stdout
        #[arg(long, requires = "alloc")]
        stderr: bool,
        /// Number of lines to display
        #[arg(short = 'n', long)]
        lines: Option<usize>,
        /// Bytes to scan for line boundaries before printing untrimmed output
        #[arg(long)]
        search_limit: Option<usize>,
        /// Give up after this many milliseconds without new data (0 waits forever)
        #[arg(long)]
        timeout_ms: Option<u64>,
    },

    /// Print the node ID of the local client agent
    NodeId,

    /// Show the local agent's member details and stats
    AgentInfo,

    /// List gossip members known to the local agent
    Members,

    /// Display version information
    Version,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("TAILGATE_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing();

    let result = match cli.command {
        Commands::Logs {
            path,
            alloc,
            task,
            stderr,
            lines,
            search_limit,
            timeout_ms,
        } => {
            let source = match alloc {
                Some(alloc_id) => LogSource::Task {
                    alloc_id,
                    task: task.unwrap_or_default(),
                    kind: if stderr { LogKind::Stderr } else { LogKind::Stdout },
                },
                None => LogSource::from_path(path),
            };
            let options = LogsOptions {
                lines,
                search_limit,
                timeout_ms,
                address: cli.address,
            };
            commands::logs::run(source, options)
        }
        Commands::NodeId => commands::agent::node_id(cli.address),
        Commands::AgentInfo => commands::agent::info(cli.address),
        Commands::Members => commands::agent::members(cli.address),
        Commands::Version => {
            println!("tailgate v{}", VERSION);
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
