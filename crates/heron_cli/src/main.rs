mod logging;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use heron_core::prelude::*;
use heron_jobs::{TaskManager, TaskManagerConfig};
use heron_local::LocalConnector;
use heron_server::HeronServer;
use heron_ssh::SshConnector;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "heron", version, about = "Run scripts in a remote compute environment")]
struct Cli {
    /// Debug logging for heron crates (overrides HERON_LOG).
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Run jobs against a local sandbox directory instead of the remote host.
    #[arg(long, global = true, env = "HERON_SANDBOX")]
    sandbox: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the job HTTP API.
    Serve {
        #[arg(long, env = "HERON_ADDR", default_value = "127.0.0.1:3000")]
        addr: String,
    },
    /// Run one job to completion and print its result as JSON.
    Run {
        script: PathBuf,
        directory: PathBuf,
        #[arg(long, default_value_t = 24 * 60 * 60)]
        timeout_secs: u64,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    match (cli.command, cli.sandbox) {
        (Command::Serve { addr }, None) => serve(SshConnector::new(), &addr).await,
        (Command::Serve { addr }, Some(home)) => serve(LocalConnector::new(home), &addr).await,
        (
            Command::Run {
                script,
                directory,
                timeout_secs,
            },
            sandbox,
        ) => {
            let job = RunArgs {
                script,
                directory,
                timeout: Duration::from_secs(timeout_secs),
            };
            match sandbox {
                None => run(SshConnector::new(), job).await,
                Some(home) => run(LocalConnector::new(home), job).await,
            }
        }
    }
}

struct RunArgs {
    script: PathBuf,
    directory: PathBuf,
    timeout: Duration,
}

async fn serve<C: Connector>(connector: C, addr: &str) -> Result<ExitCode> {
    let manager = TaskManager::new(connector, EnvConfigProvider, TaskManagerConfig::default());
    let app = HeronServer::default().build(manager);
    heron_server::serve(addr, app)
        .await
        .with_context(|| format!("server on {addr} failed"))?;
    Ok(ExitCode::SUCCESS)
}

async fn run<C: Connector>(connector: C, args: RunArgs) -> Result<ExitCode> {
    let RunArgs {
        script,
        directory,
        timeout,
    } = args;
    let manager = TaskManager::new(connector, EnvConfigProvider, TaskManagerConfig::default());
    let response = manager.submit(&script, &directory);
    if !response.accepted {
        eprintln!("{}", response.message);
        return Ok(ExitCode::from(2));
    }
    info!(job_id = ?response.job_id, "job submitted");

    let status = manager.wait(timeout).await;
    if !status.is_terminal() {
        eprintln!("job did not finish within {}s", timeout.as_secs());
        return Ok(ExitCode::from(3));
    }

    let result = manager.get_last_result();
    println!("{}", serde_json::to_string_pretty(&result)?);

    Ok(match result.result {
        Some(r) if r.succeeded() => ExitCode::SUCCESS,
        _ => ExitCode::FAILURE,
    })
}
