use anyhow::{Context, Result};
use std::process::{Command, ExitStatus, Stdio};

use crate::prompt::BinaryQuestion;

pub const REBOOT_QUESTION: &str =
    "Do you want to reboot your computer now for changes to take effect?";

/// Run a command and inherit stdio (shows output in real-time)
pub fn run(cmd: &str, args: &[&str]) -> Result<ExitStatus> {
    Command::new(cmd)
        .args(args)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .with_context(|| format!("Failed to execute: {} {}", cmd, args.join(" ")))
}

/// Something that can reboot the machine
pub trait RebootInvoker {
    fn reboot(&self) -> Result<()>;
}

/// Reboots through the system `reboot` command
pub struct SystemReboot;

impl RebootInvoker for SystemReboot {
    fn reboot(&self) -> Result<()> {
        // Fire-and-forget: a successful reboot may never return here.
        let status = run("reboot", &["now"])?;
        log::debug!("reboot exited with {status}");
        Ok(())
    }
}

pub fn reboot_question() -> Result<BinaryQuestion> {
    BinaryQuestion::new(REBOOT_QUESTION, "Enter a Y or a N", Some("N"))
}

/// Reboot when the answer was yes
pub fn maybe_reboot(answer: bool, invoker: &dyn RebootInvoker) -> Result<bool> {
    if answer {
        invoker.reboot()?;
    }
    Ok(answer)
}
