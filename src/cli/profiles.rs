//! Profiles subcommand implementation.
//!
//! Handles the `portprobe profiles` command for inspecting built-in profiles.

use crate::config::Profile;
use crate::error::CliResult;
use clap::{Parser, Subcommand};
use console::style;
use std::io::{self, Write};

/// Inspect built-in scan profiles.
#[derive(Parser, Debug)]
pub struct ProfilesCommand {
    #[command(subcommand)]
    pub action: ProfilesAction,
}

/// Profile actions.
#[derive(Subcommand, Debug)]
pub enum ProfilesAction {
    /// List all available profiles
    List,

    /// Show details of a specific profile
    Show {
        /// Profile name
        name: String,
    },
}

impl ProfilesCommand {
    /// Execute the profiles command.
    pub fn execute(&self, quiet: bool) -> CliResult<()> {
        let mut out = io::stdout().lock();
        match &self.action {
            ProfilesAction::List => list_profiles(&mut out, quiet),
            ProfilesAction::Show { name } => show_profile(&mut out, Profile::find(name)?),
        }
    }
}

fn list_profiles<W: Write>(out: &mut W, quiet: bool) -> CliResult<()> {
    if !quiet {
        writeln!(out, "\n{:<10} {:<8} {:<12} DESCRIPTION", "NAME", "PORTS", "CONCURRENCY")?;
        writeln!(out, "{}", "-".repeat(70))?;
    }

    for profile in Profile::builtins() {
        let ports = profile.port_spec().map_or(0, |spec| spec.count());
        writeln!(
            out,
            "{:<10} {:<8} {:<12} {}",
            profile.name, ports, profile.concurrency, profile.description
        )?;
    }

    if !quiet {
        writeln!(out)?;
    }
    Ok(())
}

fn show_profile<W: Write>(out: &mut W, profile: &Profile) -> CliResult<()> {
    writeln!(out, "\n{}", style(format!("Profile: {}", profile.name)).bold())?;
    writeln!(out, "{}", "-".repeat(40))?;
    writeln!(out, "  Description:  {}", profile.description)?;
    writeln!(out, "  Ports:        {}", profile.ports)?;
    writeln!(out, "  Concurrency:  {}", profile.concurrency)?;
    writeln!(out, "  Timeout:      {}ms", profile.timeout_ms)?;
    writeln!(
        out,
        "  Banner grab:  {}",
        if profile.banner { "yes" } else { "no" }
    )?;
    writeln!(out)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_names_every_profile() {
        let mut buf = Vec::new();
        list_profiles(&mut buf, true).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text.lines().count(), Profile::builtins().len());
        assert!(text.lines().any(|l| l.starts_with("full") && l.contains("65535")));
    }

    #[test]
    fn test_show_profile() {
        console::set_colors_enabled(false);
        let mut buf = Vec::new();
        show_profile(&mut buf, Profile::find("database").unwrap()).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("Profile: database"));
        assert!(text.contains("5432"));
    }
}
