//! `install` / `uninstall`: apply or remove the selected parts

use anyhow::Result;
use playbook::{Action, AnsiblePlaybook, Error, Orchestrator, OrchestratorSettings, RunReport};

use crate::Context;
use crate::cli::ApplyArgs;
use crate::config::Settings;
use crate::paths;
use crate::runner::{self, SystemReboot};
use crate::signal;
use crate::sudo::{self, SudoIdentity};
use crate::ui;

/// Exit status after an operator interrupt (128 + SIGINT)
const EXIT_INTERRUPTED: i32 = 130;

/// `-vvv` for the engine in verbose mode
const VERBOSE_ENGINE_LEVEL: u8 = 3;

pub fn run(ctx: &Context, action: Action, args: ApplyArgs) -> Result<()> {
    let settings = Settings::load()?;
    let engine = AnsiblePlaybook::locate(&settings.engine)?.with_interrupt_check(signal::interrupted);
    log::debug!("Using {}", engine.program().display());

    let roles_root = paths::roles_dir(settings.roles_dir.as_deref());
    let available = paths::available_parts(&roles_root)?;
    let parts = resolve_parts(&args.parts, &available)?;

    ui::header(&format!("i3-xfce {action}"));
    ui::kv("Roles", &roles_root.display().to_string());
    ui::kv("Parts", &parts.join(", "));
    if args.dryrun {
        ui::info("Dry run: no changes will be applied");
    }
    if !sudo::is_root() {
        ui::warn("Not running as root, tasks needing privileges will fail");
    }

    let orchestrator_settings = OrchestratorSettings {
        roles_root,
        verbosity: engine_verbosity(ctx.verbose),
        renderer: settings.renderer(),
    };
    let mut orchestrator = Orchestrator::new(engine, SudoIdentity, orchestrator_settings)
        .with_interrupt_check(signal::interrupted);

    signal::install()?;
    let outcome = orchestrator.execute_action(action, &parts, args.dryrun);
    signal::restore();

    match outcome {
        Ok(report) => print_report(&report),
        Err(Error::Interrupted) => {
            ui::warn("Interrupted, tasks that already ran are not rolled back");
            std::process::exit(EXIT_INTERRUPTED);
        }
        Err(e) => {
            if e.is_task_execution() {
                ui::error(
                    "A task failed to execute, check the messages and correct the issue before restarting i3-xfce",
                );
            }
            return Err(e.into());
        }
    }

    if !args.dryrun {
        let answer = runner::reboot_question()?.ask()?;
        runner::maybe_reboot(answer, &SystemReboot)?;
    }

    Ok(())
}

fn engine_verbosity(verbose: bool) -> u8 {
    if verbose {
        VERBOSE_ENGINE_LEVEL
    } else {
        0
    }
}

/// The parts to apply: all of them when none were requested
fn resolve_parts(requested: &[String], available: &[String]) -> Result<Vec<String>> {
    if requested.is_empty() {
        return Ok(available.to_vec());
    }

    let mut parts: Vec<String> = Vec::with_capacity(requested.len());
    for part in requested {
        if !available.contains(part) {
            return Err(Error::Configuration(format!(
                "Unknown part '{}', available parts: {}",
                part,
                available.join(", ")
            ))
            .into());
        }
        if !parts.contains(part) {
            parts.push(part.clone());
        }
    }
    Ok(parts)
}

fn print_report(report: &RunReport) {
    println!();
    let verb = if report.check_mode {
        "checked"
    } else {
        match report.action {
            Action::Install => "installed",
            Action::Uninstall => "uninstalled",
        }
    };
    ui::success(&format!(
        "Everything {verb}: {}/{} tasks",
        report.completed_steps, report.total_steps
    ));
    ui::kv("ok", &report.ok.to_string());
    ui::kv("changed", &report.changed.to_string());
    ui::kv("skipped", &report.skipped.to_string());
}
