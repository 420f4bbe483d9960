use color_eyre::Result;
use dialoguer::{Confirm, Input};

/// Prompt for a string value with optional default
pub fn prompt_string(prompt: &str, default: Option<&str>) -> Result<String> {
    let mut input_builder = Input::<String>::new()
        .with_prompt(prompt)
        .allow_empty(true);

    if let Some(default_value) = default {
        input_builder = input_builder.default(default_value.to_string());
    }

    input_builder
        .interact_text()
        .map(|s| s.trim().to_string())
        .map_err(|e| color_eyre::eyre::eyre!("Failed to read input: {}", e))
}

/// Prompt for a secret without echoing it.
/// An empty answer keeps `current` when there is one.
pub fn prompt_secret(prompt: &str, current: Option<&str>) -> Result<String> {
    let label = match current {
        Some(_) => format!("{} (leave empty to keep current): ", prompt),
        None => format!("{}: ", prompt),
    };
    let value = rpassword::prompt_password(label)
        .map_err(|e| color_eyre::eyre::eyre!("Failed to read secret: {}", e))?;
    let value = value.trim().to_string();
    match current {
        Some(existing) if value.is_empty() => Ok(existing.to_string()),
        _ => Ok(value),
    }
}

/// Prompt for yes/no with optional default
pub fn prompt_yes_no(prompt: &str, default: Option<bool>) -> Result<bool> {
    let mut confirm_builder = Confirm::new().with_prompt(prompt);

    if let Some(default_value) = default {
        confirm_builder = confirm_builder.default(default_value);
    }

    confirm_builder
        .interact()
        .map_err(|e| color_eyre::eyre::eyre!("Failed to read confirmation: {}", e))
}

/// Prompt for a positive number, re-asking until the input parses
pub fn prompt_number(prompt: &str, default: usize) -> Result<usize> {
    loop {
        let input = prompt_string(prompt, Some(&default.to_string()))?;
        if input.is_empty() {
            return Ok(default);
        }
        match input.parse::<usize>() {
            Ok(num) if num > 0 => return Ok(num),
            _ => eprintln!("Invalid input. Please enter a number greater than zero."),
        }
    }
}
