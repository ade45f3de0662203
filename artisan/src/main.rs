//! Autonomous Blender modeling session CLI.
//!
//! `artisan run requirement.json` drives a live Blender instance (via the
//! addon's TCP tool interface) through a planned, quality-gated modeling
//! session and prints the final run report as JSON.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Deserialize;

use artisan::agents::inspector::SceneInspector;
use artisan::exit_codes;
use artisan::io::backend::SocketBackend;
use artisan::io::config::{ArtisanConfig, load_config};
use artisan::io::model::AnthropicClient;
use artisan::logging;
use artisan::run::{Orchestrator, RunOptions};
use artisan::session::SessionKey;

#[derive(Parser)]
#[command(
    name = "artisan",
    version,
    about = "Quality-gated Blender modeling session orchestrator"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a modeling session from a requirement file.
    Run {
        /// Requirement JSON file (`refined_prompt`, `enable_refinement_steps`).
        requirement: PathBuf,
        /// Start from scratch even when the scene has prior work.
        #[arg(long)]
        no_resume: bool,
        /// Session id override; derived from the requirement text by default.
        #[arg(long)]
        session: Option<String>,
        /// Config TOML path; defaults apply when the file is missing.
        #[arg(long, default_value = "artisan.toml")]
        config: PathBuf,
        /// Root directory for session screenshot output.
        #[arg(long, default_value = "data/screenshots")]
        snapshot_dir: PathBuf,
    },
    /// Print the backend's current scene report and exit.
    Inspect {
        #[arg(long, default_value = "artisan.toml")]
        config: PathBuf,
    },
}

/// On-disk requirement format, matching the prompt-refinement pipeline's
/// output.
#[derive(Debug, Deserialize)]
struct RequirementFile {
    refined_prompt: String,
    #[serde(default = "default_true")]
    enable_refinement_steps: bool,
}

fn default_true() -> bool {
    true
}

fn main() {
    logging::init();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(exit_codes::INVALID);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Run {
            requirement,
            no_resume,
            session,
            config,
            snapshot_dir,
        } => cmd_run(&requirement, no_resume, session, &config, snapshot_dir),
        Command::Inspect { config } => cmd_inspect(&config),
    }
}

fn cmd_run(
    requirement_path: &Path,
    no_resume: bool,
    session: Option<String>,
    config_path: &Path,
    snapshot_dir: PathBuf,
) -> Result<i32> {
    let config = load_config(config_path)?;
    let requirement = load_requirement(requirement_path)?;
    let key = match session {
        Some(id) => SessionKey::derive(&id),
        None => SessionKey::derive(&requirement.refined_prompt),
    };

    let backend = backend_from(&config);
    let client = AnthropicClient::from_env(&config.model)?;
    let options = RunOptions {
        resume: !no_resume,
        enable_refinement: requirement.enable_refinement_steps,
    };

    let orchestrator = Orchestrator::new(&backend, &client, &client, &config, snapshot_dir);
    let report = orchestrator.run(&requirement.refined_prompt, key, options)?;

    let mut payload = serde_json::to_string_pretty(&report).context("serialize run report")?;
    payload.push('\n');
    print!("{payload}");

    Ok(if report.success {
        exit_codes::OK
    } else {
        exit_codes::HALTED
    })
}

fn cmd_inspect(config_path: &Path) -> Result<i32> {
    let config = load_config(config_path)?;
    let backend = backend_from(&config);
    let inspection = SceneInspector::new(&backend, config.capture.snapshot_max_size).inspect()?;
    println!("{}", inspection.scene.raw);
    Ok(exit_codes::OK)
}

fn backend_from(config: &ArtisanConfig) -> SocketBackend {
    SocketBackend::new(
        config.backend.host.clone(),
        config.backend.port,
        config.backend.timeout(),
    )
}

fn load_requirement(path: &Path) -> Result<RequirementFile> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read requirement {}", path.display()))?;
    let requirement: RequirementFile = serde_json::from_str(&contents)
        .with_context(|| format!("parse requirement {}", path.display()))?;
    if requirement.refined_prompt.trim().is_empty() {
        anyhow::bail!("requirement {} has an empty refined_prompt", path.display());
    }
    Ok(requirement)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_run_defaults() {
        let cli = Cli::parse_from(["artisan", "run", "req.json"]);
        let Command::Run {
            requirement,
            no_resume,
            session,
            config,
            snapshot_dir,
        } = cli.command
        else {
            panic!("expected run command");
        };
        assert_eq!(requirement, PathBuf::from("req.json"));
        assert!(!no_resume);
        assert!(session.is_none());
        assert_eq!(config, PathBuf::from("artisan.toml"));
        assert_eq!(snapshot_dir, PathBuf::from("data/screenshots"));
    }

    #[test]
    fn parse_run_with_overrides() {
        let cli = Cli::parse_from([
            "artisan",
            "run",
            "req.json",
            "--no-resume",
            "--session",
            "nightly-42",
            "--snapshot-dir",
            "/tmp/shots",
        ]);
        let Command::Run {
            no_resume, session, ..
        } = cli.command
        else {
            panic!("expected run command");
        };
        assert!(no_resume);
        assert_eq!(session.as_deref(), Some("nightly-42"));
    }

    #[test]
    fn parse_inspect() {
        let cli = Cli::parse_from(["artisan", "inspect"]);
        assert!(matches!(cli.command, Command::Inspect { .. }));
    }

    #[test]
    fn requirement_defaults_refinement_on() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("req.json");
        fs::write(&path, r#"{"refined_prompt": "a gothic clock tower"}"#).expect("write");
        let requirement = load_requirement(&path).expect("load");
        assert_eq!(requirement.refined_prompt, "a gothic clock tower");
        assert!(requirement.enable_refinement_steps);
    }

    #[test]
    fn empty_requirement_is_rejected() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("req.json");
        fs::write(
            &path,
            r#"{"refined_prompt": "  ", "enable_refinement_steps": false}"#,
        )
        .expect("write");
        assert!(load_requirement(&path).is_err());
    }
}
