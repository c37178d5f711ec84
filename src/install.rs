//! `install` and `uninstall`: the shell alias that exports the chosen profile.
//!
//! `install` writes `<alias>.sh` next to the binary and appends
//! `alias <alias>="source <script>"` to the shell config script. The script
//! runs the binary with the install-time flags, then exports the profile name
//! found in `~/.canu` as `AWS_PROFILE`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{info, warn};

use crate::error::Error;
use crate::files;
use crate::settings::{AliasSettings, Settings};

/// Path of the alias script: `<dir of executable>/<alias>.sh`.
pub fn script_path(executable: &Path, alias_name: &str) -> PathBuf {
    executable
        .parent()
        .unwrap_or_else(|| Path::new(""))
        .join(format!("{alias_name}.sh"))
}

/// The binary invocation baked into the alias script.
pub fn build_command(executable: &Path, settings: &Settings) -> String {
    let mut command = format!(
        "{} --config-path {}",
        executable.display(),
        settings.config_path.display()
    );
    for include in &settings.include {
        command.push_str(&format!(" --include {include}"));
    }
    for exclude in &settings.exclude {
        command.push_str(&format!(" --exclude {exclude}"));
    }
    command
}

pub fn script_content(command: &str, marker: &Path) -> String {
    let marker = marker.display();
    format!(
        r#"#!/bin/sh

{command}

selected_profile="$(cat {marker})"

if [ ! -z "$selected_profile" ]
then
  export AWS_PROFILE="$selected_profile"
else
  echo "error, {marker} file doesn't contain a profile name"
fi
"#
    )
}

pub fn alias_command(alias_name: &str, script: &Path) -> String {
    format!("alias {alias_name}=\"source {}\"", script.display())
}

pub fn install(settings: &Settings, alias: &AliasSettings) -> Result<()> {
    let executable =
        std::env::current_exe().context("error while reading path for canu binary")?;
    install_for(&executable, settings, alias)
}

pub fn install_for(executable: &Path, settings: &Settings, alias: &AliasSettings) -> Result<()> {
    let script = script_path(executable, &alias.alias_name);
    let command = build_command(executable, settings);
    info!("command: {command}");

    info!("creating script {} for alias {} ...", script.display(), alias.alias_name);
    let content = script_content(&command, &settings.marker_path());
    files::write_with_mode(&script, content.as_bytes(), 0o700)
        .map_err(|e| Error::persistence(&script, e))?;
    info!("created script {} for alias {}", script.display(), alias.alias_name);

    let alias_command = alias_command(&alias.alias_name, &script);

    if alias.skip_alias {
        println!(
            "--skip-alias flag was provided, please add manually to your {}:\n{alias_command}",
            alias.shell_config.display()
        );
        return Ok(());
    }

    info!(
        "creating alias {} in shell config file {} ...",
        alias.alias_name,
        alias.shell_config.display()
    );
    files::append(&alias.shell_config, &format!("\n{alias_command}\n"))
        .map_err(|e| Error::persistence(&alias.shell_config, e))?;

    println!(
        "alias {} added to {}, reload your shell or run manually: {alias_command}",
        alias.alias_name,
        alias.shell_config.display()
    );
    Ok(())
}

pub fn uninstall(alias: &AliasSettings) -> Result<()> {
    let executable =
        std::env::current_exe().context("error while reading path for canu binary")?;
    uninstall_for(&executable, alias)
}

pub fn uninstall_for(executable: &Path, alias: &AliasSettings) -> Result<()> {
    let script = script_path(executable, &alias.alias_name);

    info!("trying to remove file {} for alias {} ...", script.display(), alias.alias_name);
    match fs::remove_file(&script) {
        Ok(()) => info!("file {} for alias {} removed", script.display(), alias.alias_name),
        Err(e) if e.kind() == io::ErrorKind::NotFound => warn!(
            "script {} for alias {} not found, uninstall will continue",
            script.display(),
            alias.alias_name
        ),
        Err(e) => warn!(
            "error while removing file {} for alias {}, you may need to remove it manually: {e}",
            script.display(),
            alias.alias_name
        ),
    }

    info!(
        "trying to remove alias {} from shell config script {} ...",
        alias.alias_name,
        alias.shell_config.display()
    );
    let prefix = format!("alias {}=", alias.alias_name);
    let removed = files::remove_lines_starting_with(&alias.shell_config, &prefix)
        .map_err(|e| Error::persistence(&alias.shell_config, e))?;
    for line in removed {
        info!("found match for alias: {line}, removed");
    }

    println!("uninstall for alias {} done!", alias.alias_name);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::ProfileArgs;

    fn settings(home: &Path) -> Settings {
        Settings::with_home(
            ProfileArgs {
                config_path: None,
                include: vec!["dev".into(), "ops".into()],
                exclude: vec!["legacy".into()],
            },
            home.to_path_buf(),
        )
        .unwrap()
    }

    fn alias(shell_config: PathBuf, skip_alias: bool) -> AliasSettings {
        AliasSettings {
            alias_name: "canu".into(),
            shell_config,
            skip_alias,
        }
    }

    #[test]
    fn command_carries_filters() {
        let command = build_command(Path::new("/opt/bin/_canu"), &settings(Path::new("/home/me")));
        assert_eq!(
            command,
            "/opt/bin/_canu --config-path /home/me/.aws/config --include dev --include ops --exclude legacy"
        );
    }

    #[test]
    fn script_exports_marker_contents() {
        let content = script_content("/opt/bin/_canu", Path::new("/home/me/.canu"));
        assert!(content.starts_with("#!/bin/sh\n"));
        assert!(content.contains("selected_profile=\"$(cat /home/me/.canu)\""));
        assert!(content.contains("export AWS_PROFILE=\"$selected_profile\""));
    }

    #[test]
    fn install_then_uninstall() {
        let dir = tempfile::tempdir().unwrap();
        let bin = dir.path().join("bin");
        fs::create_dir_all(&bin).unwrap();
        let executable = bin.join("_canu");
        let rc = dir.path().join(".bash_profile");
        fs::write(&rc, "export EDITOR=vi\n").unwrap();

        install_for(&executable, &settings(dir.path()), &alias(rc.clone(), false)).unwrap();

        let script = bin.join("canu.sh");
        assert!(script.exists());
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(&script).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o700);
        }
        let expected_alias = format!("alias canu=\"source {}\"", script.display());
        assert_eq!(
            fs::read_to_string(&rc).unwrap(),
            format!("export EDITOR=vi\n\n{expected_alias}\n")
        );

        uninstall_for(&executable, &alias(rc.clone(), false)).unwrap();

        assert!(!script.exists());
        assert_eq!(fs::read_to_string(&rc).unwrap(), "export EDITOR=vi\n\n");
    }

    #[test]
    fn skip_alias_leaves_shell_config_alone() {
        let dir = tempfile::tempdir().unwrap();
        let executable = dir.path().join("_canu");
        let rc = dir.path().join(".bash_profile");
        fs::write(&rc, "export EDITOR=vi\n").unwrap();

        install_for(&executable, &settings(dir.path()), &alias(rc.clone(), true)).unwrap();

        assert!(dir.path().join("canu.sh").exists());
        assert_eq!(fs::read_to_string(&rc).unwrap(), "export EDITOR=vi\n");
    }

    #[test]
    fn uninstall_without_script_still_cleans_shell_config() {
        let dir = tempfile::tempdir().unwrap();
        let rc = dir.path().join(".zshrc");
        fs::write(&rc, "alias canu=\"source /gone/canu.sh\"\nalias ll=\"ls -l\"\n").unwrap();

        uninstall_for(&dir.path().join("_canu"), &alias(rc.clone(), false)).unwrap();

        assert_eq!(fs::read_to_string(&rc).unwrap(), "alias ll=\"ls -l\"\n");
    }
}
