use anyhow::{Context, Result};
use dialoguer::{Select, theme::ColorfulTheme};

/// Shows the profile menu. `None` when the user backs out with Esc or `q`.
pub fn choose_profile(names: &[String]) -> Result<Option<String>> {
    let index = Select::with_theme(&ColorfulTheme::default())
        .with_prompt("Choose a profile")
        .items(names)
        .default(0)
        .interact_opt()
        .context("error while selecting a profile")?;

    Ok(index.and_then(|i| names.get(i).cloned()))
}
