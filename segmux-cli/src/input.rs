//! Collects the job inputs from flags, environment, or the terminal.

use inquire::{CustomUserError, InquireError, Text, validator::Validation};
use segmux_engine::JobRequest;
use tracing::debug;

use crate::error::AppError;

/// Asks for one value on the terminal. inquire switches the terminal into raw
/// mode for the prompt and restores it when the prompt returns, on every path.
fn ask(message: &str, flag: &str) -> Result<String, AppError> {
    let answer = Text::new(message)
        .with_validator(|input: &str| -> Result<Validation, CustomUserError> {
            Ok(if input.trim().is_empty() {
                Validation::Invalid("A value is required".into())
            } else {
                Validation::Valid
            })
        })
        .prompt();

    match answer {
        Ok(value) => Ok(value.trim().to_string()),
        Err(InquireError::NotTTY) => Err(AppError::InvalidInput(format!(
            "No terminal to prompt on, pass {flag}"
        ))),
        Err(e) => Err(AppError::Prompt(e.to_string())),
    }
}

/// Builds the job from whatever was supplied up front, prompting for the rest
/// when allowed.
pub fn collect_job(
    url: Option<&str>,
    name: Option<&str>,
    allow_prompt: bool,
) -> Result<JobRequest, AppError> {
    let url = url.map(str::trim).filter(|s| !s.is_empty());
    let name = name.map(str::trim).filter(|s| !s.is_empty());

    let job = match (url, name) {
        (Some(url), Some(name)) => JobRequest::new(url, name),
        _ if !allow_prompt => {
            let missing = if url.is_none() { "--url" } else { "--name" };
            return Err(AppError::InvalidInput(format!(
                "Missing {missing} and prompting is disabled"
            )));
        }
        _ => {
            debug!("Prompting for missing job inputs");
            let url = match url {
                Some(url) => url.to_string(),
                None => ask("Enter the playlist URL:", "--url")?,
            };
            let name = match name {
                Some(name) => name.to_string(),
                None => ask("Enter the output file name:", "--name")?,
            };
            JobRequest::new(url, name)
        }
    };

    job.validate()?;
    Ok(job)
}
