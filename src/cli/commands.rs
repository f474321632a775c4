//! Command dispatch

use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;

use clap::CommandFactory;
use tracing::{debug, instrument};

use crate::cli::args::{Cli, Commands, ConfigCommands, WorkspaceCommands};
use crate::cli::output;
use crate::cli::{CliError, CliResult};
use crate::config::Settings;
use crate::domain::{CallerIdentity, ExecutionResult};
use crate::exitcode;
use crate::infrastructure::di::ServiceContainer;
use crate::infrastructure::InfraError;

/// Run the parsed command; returns the process exit code.
pub fn execute_command(cli: &Cli) -> CliResult<i32> {
    let Some(command) = &cli.command else {
        return Err(CliError::Usage("no command given, see --help".into()));
    };

    // Completion needs no settings
    if let Commands::Completion { shell } = command {
        let mut cmd = Cli::command();
        let name = cmd.get_name().to_string();
        clap_complete::generate(*shell, &mut cmd, name, &mut io::stdout());
        return Ok(exitcode::OK);
    }

    let settings = Settings::load(cli.config.as_deref())?;
    debug!("settings loaded");

    match command {
        Commands::Wipe { caller } => cmd_wipe(settings, caller),
        Commands::Workspace { command } => cmd_workspace(settings, command),
        Commands::Plan => cmd_plan(settings),
        Commands::Runner {
            test_config,
            output,
            target,
        } => cmd_runner(settings, test_config, output, target.as_deref()),
        Commands::Summarize {
            start,
            stop,
            invalid,
        } => cmd_summarize(settings, *start, *stop, invalid),
        Commands::Translate { input } => cmd_translate(settings, input.as_deref()),
        Commands::Config { command } => cmd_config(&settings, command),
        Commands::Completion { .. } => Ok(exitcode::OK),
    }
}

#[instrument(skip(settings))]
fn cmd_wipe(settings: Settings, caller: &str) -> CliResult<i32> {
    let container = ServiceContainer::new(settings)?;
    let outcome = container
        .orchestrator()?
        .wipe_environment(&CallerIdentity::from(caller));

    match outcome {
        Ok(outcome) => {
            let state = outcome.state();
            let (exit_code, transcript) = outcome.into_parts();
            output::raw(&transcript);
            if exit_code == 0 {
                output::success("environment wiped");
            } else {
                output::failure(&format!(
                    "wipe halted ({:?}) with exit code {}",
                    state, exit_code
                ));
            }
            Ok(exitcode::step_exit_code(exit_code))
        }
        Err(e) => {
            let e = CliError::from(e);
            if let Some(transcript) = e.transcript() {
                output::raw(transcript);
            }
            Err(e)
        }
    }
}

#[instrument(skip(settings))]
fn cmd_workspace(settings: Settings, command: &WorkspaceCommands) -> CliResult<i32> {
    let container = ServiceContainer::new(settings)?;
    let orchestrator = container.orchestrator()?;
    let (action, result) = match command {
        WorkspaceCommands::Stop { caller } => (
            "stopped",
            orchestrator.stop_workspace_service(&CallerIdentity::from(caller.as_str()))?,
        ),
        WorkspaceCommands::Start { caller } => (
            "started",
            orchestrator.start_workspace_service(&CallerIdentity::from(caller.as_str()))?,
        ),
    };
    report_single(action, result)
}

fn report_single(action: &str, result: ExecutionResult) -> CliResult<i32> {
    let (exit_code, text) = result.into_parts();
    output::raw(&text);
    if exit_code == 0 {
        output::success(&format!("workspace service {}", action));
    } else {
        output::failure(&format!("exit code {}", exit_code));
    }
    Ok(exitcode::step_exit_code(exit_code))
}

fn cmd_plan(settings: Settings) -> CliResult<i32> {
    let container = ServiceContainer::new(settings)?;
    output::header("Wipe plan:");
    for (i, step) in container.orchestrator()?.plan().iter().enumerate() {
        output::detail(&format!("{}. {}", i + 1, step));
    }
    if container.settings.wipe.reseed_admin {
        output::detail(&format!(
            "admin record {} is reseeded during step 'reset databases'",
            container.settings.wipe.admin.username
        ));
    }
    Ok(exitcode::OK)
}

#[instrument(skip(settings))]
fn cmd_runner(
    mut settings: Settings,
    test_config: &Path,
    out: &Path,
    target: Option<&str>,
) -> CliResult<i32> {
    if let Some(target) = target {
        settings.runner.target = target.to_string();
    }
    ServiceContainer::new(settings)?
        .runner_script_generator()
        .generate(test_config, out)?;
    output::success(&format!("wrote {}", out.display()));
    Ok(exitcode::OK)
}

#[instrument(skip(settings, invalid))]
fn cmd_summarize(settings: Settings, start: u32, stop: u32, invalid: &[u32]) -> CliResult<i32> {
    if start > stop {
        return Err(CliError::InvalidArgs(format!(
            "start job {} is after stop job {}",
            start, stop
        )));
    }
    let container = ServiceContainer::new(settings)?;
    let summary = container.test_summarizer()?.collect(start..=stop, invalid)?;
    output::raw(&summary.render());
    Ok(exitcode::OK)
}

#[instrument(skip(settings))]
fn cmd_translate(settings: Settings, input: Option<&Path>) -> CliResult<i32> {
    let container = ServiceContainer::new(settings)?;
    let translator = container.id_translator()?;
    let stdout = io::stdout();
    let stats = match input {
        Some(path) => {
            let file = File::open(path).map_err(|e| {
                InfraError::io(format!("open {}", path.display()), e)
            })?;
            translator.translate(BufReader::new(file), stdout.lock())?
        }
        None => translator.translate(io::stdin().lock(), stdout.lock())?,
    };
    debug!("translate: {:?}", stats);
    let summary = format!(
        "translated {}, failed {}, retries {}",
        stats.translated, stats.failed, stats.retries
    );
    if stats.failed == 0 {
        output::success(&summary);
    } else {
        output::failure(&summary);
    }
    Ok(exitcode::OK)
}

fn cmd_config(settings: &Settings, command: &ConfigCommands) -> CliResult<i32> {
    match command {
        ConfigCommands::Show => output::raw(&settings.to_toml()?),
        ConfigCommands::Template => output::raw(&Settings::template()),
    }
    Ok(exitcode::OK)
}
