// UI layer: terminal prompts, highlighted output and progress display.
// Everything here only talks to the user; no requests are made from it.

use anyhow::Result;
use crossterm::style::Stylize;
use dialoguer::{Input, Password};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::Value;

use crate::upload::{ChunkOutcome, ChunkStatus, JobSummary, ProgressObserver};

/// Collect username and password for login.
pub fn prompt_credentials() -> Result<(String, String)> {
    // `Input::interact_text()` prompts the user for input and returns it.
    let username: String = Input::new().with_prompt("Username").interact_text()?;
    // `Password` hides input in terminal for passwords.
    let password: String = Password::new().with_prompt("Password").interact()?;
    Ok((username, password))
}

/// Print `label: <id>` with the id highlighted.
pub fn print_id(label: &str, id: &str) {
    println!("{} id: {}", label, id.green());
}

pub fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn print_error(message: &str) {
    eprintln!("{}", message.red());
}

/// Spinner shown while a single request is running.
pub fn spinner(message: &'static str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message(message);
    spinner.enable_steady_tick(std::time::Duration::from_millis(100));
    spinner
}

/// Upload progress bar counting images, advanced a chunk at a time.
pub struct UploadProgress {
    bar: ProgressBar,
}

impl UploadProgress {
    pub fn new() -> Self {
        let bar = ProgressBar::new(0);
        if let Ok(style) = ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {human_pos}/{human_len} images ({eta}) {msg}",
        ) {
            bar.set_style(style.progress_chars("=> "));
        }
        UploadProgress { bar }
    }
}

impl Default for UploadProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressObserver for UploadProgress {
    fn started(&self, _chunks: usize, assets: usize) {
        self.bar.set_length(assets as u64);
    }

    fn chunk_finished(&self, outcome: &ChunkOutcome) {
        if outcome.status != ChunkStatus::Reported {
            let note = format!(
                "chunk at slot {} failed ({:?})",
                outcome.start_offset, outcome.status
            );
            self.bar.println(note.yellow().to_string());
        }
        self.bar.inc(outcome.count as u64);
    }

    fn finished(&self, summary: &JobSummary) {
        let message = if summary.missing() == 0 {
            format!("{} images uploaded", summary.registered)
        } else {
            format!(
                "{} images uploaded, {} missing",
                summary.registered,
                summary.missing()
            )
        };
        self.bar.finish_with_message(message);
    }
}
