use dialoguer::{theme::ColorfulTheme, Confirm};

use super::core::CliError;

/// Asks the user a yes/no question. Defaults to "no" so a stray Enter
/// never destroys data.
pub fn confirm_action(prompt: &str) -> Result<bool, CliError> {
    Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .default(false)
        .interact()
        .map_err(|err| CliError::Io(std::io::Error::other(err.to_string())))
}
