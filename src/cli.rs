/// CLI wiring for the plotbox binary. Thin glue over the library surface:
/// read a script, submit it, write artifacts, print the outcome.
use crate::config::SandboxConfig;
use crate::sandbox::Sandbox;
use crate::types::{SafetyVerdict, SubmitOutcome};
use crate::workspace::WorkspaceManager;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::io::Read;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(author, version, about = "Workspace-isolated sandbox for untrusted plotting scripts", long_about = None)]
struct Cli {
    /// Path to a JSON configuration file (defaults apply when omitted)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Screen, execute, and collect artifacts from a script
    Run {
        /// Script file to execute
        file: PathBuf,
        /// Directory to write rendered artifacts into
        #[arg(long, default_value = ".")]
        out: PathBuf,
        /// Emit a machine-readable JSON report instead of plain text
        #[arg(long)]
        json: bool,
        /// Override the wall-clock limit in seconds
        #[arg(long)]
        timeout: Option<u64>,
    },
    /// Run only the safety pre-screener over a script
    Screen {
        /// Script file to screen
        file: PathBuf,
    },
    /// Classify raw error text read from stdin
    Classify,
    /// Remove leftover workspaces older than the given age
    CleanupStale {
        /// Maximum age in seconds before a workspace is considered stale
        #[arg(long, default_value_t = 3600)]
        max_age_secs: u64,
    },
}

#[derive(Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum RunReport {
    Rendered {
        artifacts: Vec<String>,
        output: String,
    },
    NoArtifacts {
        output: String,
    },
    Failed {
        category: String,
        message: String,
    },
}

fn load_config(path: &Option<PathBuf>) -> Result<SandboxConfig> {
    let config = match path {
        Some(p) => SandboxConfig::load_from_file(p)
            .with_context(|| format!("loading config from {}", p.display()))?,
        None => SandboxConfig::default(),
    };
    if let Some(audit_path) = &config.audit_log {
        crate::audit::init(audit_path.clone())?;
    }
    Ok(config)
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let mut config = load_config(&cli.config)?;

    match cli.command {
        Commands::Run {
            file,
            out,
            json,
            timeout,
        } => {
            if let Some(secs) = timeout {
                config.wall_time_limit_secs = secs;
                config.validate()?;
            }
            let source = std::fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;

            let sandbox = Sandbox::new(config);
            let outcome = sandbox.submit(&source);

            let report = match outcome {
                SubmitOutcome::Rendered { artifacts, output } => {
                    std::fs::create_dir_all(&out)
                        .with_context(|| format!("creating {}", out.display()))?;
                    let mut names = Vec::new();
                    for artifact in &artifacts {
                        let dest = out.join(&artifact.name);
                        std::fs::write(&dest, &artifact.data)
                            .with_context(|| format!("writing {}", dest.display()))?;
                        names.push(artifact.name.clone());
                    }
                    RunReport::Rendered {
                        artifacts: names,
                        output,
                    }
                }
                SubmitOutcome::NoArtifacts { output } => RunReport::NoArtifacts { output },
                SubmitOutcome::Failed(c) => RunReport::Failed {
                    category: format!("{:?}", c.category),
                    message: c.message,
                },
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
                // Exit code signals failure consistently across both formats
                if matches!(report, RunReport::Failed { .. }) {
                    std::process::exit(1);
                }
            } else {
                match &report {
                    RunReport::Rendered { artifacts, output } => {
                        if !output.is_empty() {
                            print!("{}", output);
                        }
                        for name in artifacts {
                            println!("wrote {}", out.join(name).display());
                        }
                    }
                    RunReport::NoArtifacts { output } => {
                        if !output.is_empty() {
                            print!("{}", output);
                        }
                        println!("Script ran but produced no plots (did it call plt.show()?)");
                    }
                    RunReport::Failed { message, .. } => {
                        eprintln!("{}", message);
                        std::process::exit(1);
                    }
                }
            }
            Ok(())
        }
        Commands::Screen { file } => {
            let source = std::fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            match crate::screen::screen(&source, &config) {
                SafetyVerdict::Accepted => {
                    println!("accepted");
                    Ok(())
                }
                SafetyVerdict::Rejected { reason, .. } => {
                    eprintln!("rejected: {}", reason);
                    std::process::exit(1);
                }
            }
        }
        Commands::Classify => {
            let mut raw = String::new();
            std::io::stdin()
                .read_to_string(&mut raw)
                .context("reading error text from stdin")?;
            let c = crate::classify::classify(&raw);
            println!("{:?}: {}", c.category, c.message);
            Ok(())
        }
        Commands::CleanupStale { max_age_secs } => {
            let manager = WorkspaceManager::new(config.workspace_base.clone())?;
            let cleaned = manager.cleanup_stale(Duration::from_secs(max_age_secs))?;
            println!("removed {} stale workspace(s)", cleaned);
            Ok(())
        }
    }
}
