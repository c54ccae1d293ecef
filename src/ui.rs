// UI layer: the few interactive bits of the client.
// Yes/no questions use `dialoguer` and long transfers show an `indicatif`
// spinner. Neither is shown when the terminal is not interactive.

use anyhow::Result;
use dialoguer::Confirm;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::IsTerminal;
use std::time::Duration;

/// Ask a yes/no question. Without a terminal on stdin the answer is "no"
/// so scripted runs never block.
pub fn ask(prompt: &str) -> Result<bool> {
    if !std::io::stdin().is_terminal() || !std::io::stderr().is_terminal() {
        tracing::info!(prompt, "not a terminal, answering no");
        return Ok(false);
    }
    let answer = Confirm::new()
        .with_prompt(format!("{prompt} (y/n)"))
        .default(false)
        .show_default(false)
        .interact()?;
    Ok(answer)
}

/// Spinner on stderr while a request is in flight. Hidden when `visible`
/// is false or stderr is not a terminal.
pub fn spinner(message: impl Into<String>, visible: bool) -> ProgressBar {
    if !visible || !std::io::stderr().is_terminal() {
        return ProgressBar::hidden();
    }
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message(message.into());
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}
