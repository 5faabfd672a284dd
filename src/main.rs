mod cli;
mod config;
mod connection;
mod git;
mod log;
mod manager;
mod menu;
mod platform;
mod profile;
mod prompt;
mod remote;
mod ssh;
mod ssh_keys;
mod ui;
mod update;

use anyhow::{bail, Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use config::Paths;
use connection::Outcome;
use git::{GitCli, GlobalIdentity};
use inquire::InquireError;
use manager::{Manager, Step};
use platform::{OsPlatform, GITHUB_SSH_SETTINGS_URL};
use profile::{ssh_host_alias, Profile};
use remote::RemoteError;
use ssh_keys::SshKeygen;
use std::path::Path;
use ui::Theme;

/// Everything a command needs, built once from the global options
pub struct App {
    pub manager: Manager<SshKeygen, GitCli>,
    pub theme: Theme,
    pub platform: OsPlatform,
}

fn main() {
    log::install();
    let cli = Cli::parse();
    let theme = Theme::detect(cli.global.no_color);

    if let Err(e) = run(cli, theme) {
        match e.downcast_ref::<InquireError>() {
            Some(InquireError::OperationInterrupted) => {
                println!();
                println!("Goodbye!");
            }
            Some(InquireError::OperationCanceled) => println!("Cancelled."),
            _ => {
                theme.error(&format!("{:#}", e));
                std::process::exit(1);
            }
        }
    }
}

fn run(cli: Cli, theme: Theme) -> Result<()> {
    let paths = Paths::resolve(cli.global.store, cli.global.ssh_dir)?;
    tracing::debug!(store = %paths.store.display(), ssh_dir = %paths.ssh_dir.display(), "resolved paths");

    let platform = OsPlatform::detect();
    check_dependencies(&theme, platform, cli::required_tools(cli.command.as_ref()))?;

    if let Err(e) = ssh_keys::restrict_ssh_dir(&paths.ssh_dir) {
        tracing::warn!("{}", e);
    }

    let app = App {
        manager: Manager::new(paths, SshKeygen, GitCli),
        theme,
        platform,
    };

    match cli.command {
        None | Some(Commands::Menu) => menu::run(&app),
        Some(Commands::Add {
            name,
            email,
            no_passphrase,
            skip_setup,
        }) => cmd_add(&app, name, email, no_passphrase, skip_setup),
        Some(Commands::Use {
            name,
            no_remote,
            no_test,
        }) => cmd_use(&app, name, no_remote, no_test),
        Some(Commands::Remove { name, yes }) => cmd_remove(&app, name, yes),
        Some(Commands::List) => cmd_list(&app),
        Some(Commands::Current { porcelain }) => cmd_current(&app, porcelain),
        Some(Commands::Test { name, all }) => cmd_test(&app, name, all),
        Some(Commands::Remote { name }) => cmd_remote(&app, name),
        Some(Commands::Update) => cmd_update(&app),
    }
}

fn check_dependencies(theme: &Theme, platform: OsPlatform, tools: &[&str]) -> Result<()> {
    let missing = platform::missing_tools(tools);
    if missing.is_empty() {
        return Ok(());
    }

    for tool in &missing {
        theme.error(&format!("Required tool '{}' not found!", tool));
        theme.info(platform.install_advice(tool));
    }
    bail!("Missing required tools: {}", missing.join(", "))
}

pub fn cmd_add(
    app: &App,
    name: Option<String>,
    email: Option<String>,
    no_passphrase: bool,
    skip_setup: bool,
) -> Result<()> {
    let theme = &app.theme;
    let manager = &app.manager;

    let name = match name {
        Some(n) => n.trim().to_string(),
        None => menu::prompt_valid(
            theme,
            "GitHub username:",
            "Also used as the profile name and SSH host alias",
            |input| {
                profile::validate_name(input)?;
                if manager.profiles().contains_key(input) {
                    bail!("Profile '{}' already exists", input);
                }
                Ok(())
            },
        )?,
    };

    let email = match email {
        Some(e) => e.trim().to_string(),
        None => menu::prompt_valid(theme, "Git email:", "Used as the commit author", |input| {
            profile::validate_email(input).map_err(Into::into)
        })?,
    };

    // Catch bad CLI input before asking for a passphrase
    manager.check_new(&name, &email)?;

    let passphrase = if no_passphrase {
        String::new()
    } else {
        menu::ask_passphrase()?
    };

    theme.info(&format!("Generating SSH key for profile '{}'...", name));
    let created = manager
        .create(&name, &email, &passphrase)
        .with_context(|| format!("Failed to create profile '{}'", name))?;

    if let Some(warning) = created.ssh_config_warning {
        theme.warning(&format!("Could not update SSH config: {}", warning));
    }
    theme.success(&format!(
        "Profile '{}' created and activated",
        theme.cyan(&created.profile.name)
    ));

    if skip_setup {
        return Ok(());
    }

    show_ssh_instructions(app, &created.profile)?;

    let test_now = inquire::Confirm::new("Test the GitHub connection now?")
        .with_default(true)
        .with_help_message("Add the key on GitHub first")
        .prompt()?;
    if test_now {
        test_profile(app, &created.profile);
    }

    Ok(())
}

/// Walk through registering a profile's public key on GitHub
pub fn show_ssh_instructions(app: &App, profile: &Profile) -> Result<()> {
    let theme = &app.theme;
    let Some(ref key_path) = profile.ssh_key else {
        bail!("Profile '{}' has no SSH key", profile.name);
    };
    let public_key = ssh_keys::read_public_key(key_path)?;

    theme.header("SSH Key Setup");
    println!();
    println!("{}", theme.yellow("Public key:"));
    println!("{}", public_key);
    println!();

    if app.platform.copy_to_clipboard(&public_key) {
        theme.success(&format!(
            "Public key copied to clipboard. {}",
            app.platform.paste_hint()
        ));
    } else {
        theme.info("Copy the public key above manually");
    }

    if app.platform.open_url(GITHUB_SSH_SETTINGS_URL) {
        theme.info("Opened GitHub SSH settings in your browser");
    } else {
        theme.info(&format!("Open {} in your browser", GITHUB_SSH_SETTINGS_URL));
    }

    println!();
    println!("{}", theme.bold("On GitHub:"));
    println!("  1. Title: {} (or any name you like)", profile.name);
    println!("  2. Key: paste the public key");
    println!("  3. Click 'Add SSH key'");
    println!();
    println!("{}", theme.bold("Clone and push through the profile's host alias:"));
    println!(
        "  {}",
        theme.cyan(&format!(
            "git@{}:username/repository.git",
            ssh_host_alias(&profile.name)
        ))
    );
    println!();

    Ok(())
}

pub fn cmd_use(app: &App, name: Option<String>, no_remote: bool, no_test: bool) -> Result<()> {
    let theme = &app.theme;

    let name = match name {
        Some(n) => n,
        None => match menu::select_profile(app, "Switch to profile:")? {
            Some(n) => n,
            None => return Ok(()),
        },
    };

    let profile = app.manager.switch(&name)?;
    theme.success(&format!("Switched to profile '{}'", theme.cyan(&name)));
    println!("  Name:  {}", profile.name);
    println!("  Email: {}", profile.email);

    if !no_remote && git::is_git_repo(Path::new(".")) {
        update_remote(app, &name);
    }

    if !no_test && profile.ssh_key.is_some() {
        test_profile(app, &profile);
    }

    Ok(())
}

/// Point origin at the profile's alias, reporting rather than failing
fn update_remote(app: &App, name: &str) {
    let theme = &app.theme;
    match remote::rewrite_for_profile(Path::new("."), name) {
        Ok(url) => theme.success(&format!("Repository remote now uses {}", theme.cyan(&url))),
        Err(RemoteError::Unsupported(url)) => {
            theme.warning(&format!("Left origin unchanged, unsupported URL: {}", url))
        }
        Err(e) => theme.warning(&e.to_string()),
    }
}

pub fn cmd_remove(app: &App, name: Option<String>, yes: bool) -> Result<()> {
    let theme = &app.theme;

    if app.manager.profiles().is_empty() {
        theme.info("No profiles to remove");
        return Ok(());
    }

    let name = match name {
        Some(n) => n,
        None => match menu::select_profile(app, "Profile to remove:")? {
            Some(n) => n,
            None => return Ok(()),
        },
    };

    let profile = app.manager.get(&name)?;

    theme.header("Profile Removal");
    println!("  Profile: {}", theme.cyan(&profile.name));
    println!("  Email:   {}", profile.email);
    println!();
    println!("{}", theme.yellow("This will remove:"));
    println!("  - Git configuration, if this profile is active");
    if let Some(ref key) = profile.ssh_key {
        println!("  - SSH private key: {}", key.display());
    }
    if let Some(public_key) = profile.public_key_path() {
        println!("  - SSH public key:  {}", public_key.display());
    }
    println!("  - SSH config entry for {}", ssh_host_alias(&profile.name));
    println!("  - Stored profile data");
    println!();

    if !yes && !menu::confirm_removal(&name)? {
        theme.info("Removal cancelled");
        return Ok(());
    }

    let deleted = app.manager.delete(&name)?;

    for step in deleted.steps() {
        match step {
            Step::Done(msg) => theme.success(msg),
            Step::Skipped(msg) => theme.info(msg),
            Step::Failed(msg) => theme.warning(msg),
        }
    }

    println!();
    if deleted.is_complete() {
        theme.success(&format!("Profile '{}' removed", deleted.profile.name));
    } else {
        theme.warning(&format!(
            "Profile '{}' removed, but some cleanup steps failed",
            deleted.profile.name
        ));
    }

    Ok(())
}

fn cmd_list(app: &App) -> Result<()> {
    let theme = &app.theme;
    let profiles = app.manager.profiles();

    if profiles.is_empty() {
        println!("No profiles configured.");
        println!("Run {} to create one.", theme.yellow("gitswitch add"));
        return Ok(());
    }

    let active = app.manager.active_profile().map(|(name, _)| name);

    println!("{}", theme.bold("Profiles:"));
    println!();

    for (name, profile) in &profiles {
        let is_active = active.as_deref() == Some(name.as_str());
        let marker = if is_active { "*" } else { " " };
        let display_name = if is_active {
            theme.green(name)
        } else {
            theme.cyan(name)
        };

        println!("{} {}", marker, display_name);
        println!("    Email:   {}", profile.email);
        match profile.ssh_key {
            Some(ref key) => println!("    SSH Key: {}", key.display()),
            None => println!("    SSH Key: {}", theme.dimmed("none")),
        }
        println!("    Host:    {}", ssh_host_alias(name));
        println!();
    }

    println!(
        "{}",
        theme.dimmed(&format!("Store: {}", app.manager.store().path().display()))
    );
    Ok(())
}

fn cmd_current(app: &App, porcelain: bool) -> Result<()> {
    if porcelain {
        let active = app.manager.active_profile().map(|(name, _)| name);
        prompt::output_porcelain(active.as_deref());
    } else {
        let current = app.manager.git().get_current();
        prompt::output_human(&app.theme, current.as_ref(), &app.manager.profiles());
    }
    Ok(())
}

pub fn cmd_test(app: &App, name: Option<String>, all: bool) -> Result<()> {
    let theme = &app.theme;
    let profiles = app.manager.profiles();

    if profiles.is_empty() {
        theme.info("No profiles configured");
        return Ok(());
    }

    if all {
        let mut failed = 0;
        for profile in profiles.values() {
            if !test_profile(app, profile) {
                failed += 1;
            }
        }
        println!();
        if failed == 0 {
            theme.success(&format!("All {} profiles authenticated", profiles.len()));
        } else {
            theme.warning(&format!("{} of {} profiles failed", failed, profiles.len()));
        }
        return Ok(());
    }

    let name = match name {
        Some(n) => n,
        None => match menu::select_profile(app, "Profile to test:")? {
            Some(n) => n,
            None => return Ok(()),
        },
    };

    let profile = app.manager.get(&name)?;
    test_profile(app, &profile);
    Ok(())
}

/// Probe GitHub with a profile's key and print the verdict
pub fn test_profile(app: &App, profile: &Profile) -> bool {
    let theme = &app.theme;

    let Some(ref key_path) = profile.ssh_key else {
        theme.warning(&format!("Profile '{}' has no SSH key", profile.name));
        return false;
    };
    if !key_path.exists() {
        theme.error(&format!("SSH key not found: {}", key_path.display()));
        return false;
    }

    theme.info(&format!(
        "Testing connection for '{}' via {}...",
        profile.name,
        ssh_host_alias(&profile.name)
    ));

    let known_hosts = app.manager.paths().known_hosts();
    match connection::test(&known_hosts, &profile.name, key_path) {
        Outcome::Success => {
            theme.success(&format!("GitHub connection successful for '{}'", profile.name));
            println!("  Account: {}", profile.name);
            println!("  Key:     {}", key_path.display());
            true
        }
        Outcome::AuthFailure(detail) => {
            theme.error(&format!("GitHub connection failed for '{}'", profile.name));
            if !detail.is_empty() {
                println!("{}", theme.yellow(&detail));
            }
            print_troubleshooting(theme, app.platform, profile);
            false
        }
        Outcome::Timeout => {
            theme.error("Connection timed out. Check your internet connection.");
            false
        }
        Outcome::Error(e) => {
            theme.error(&format!("Error testing connection: {}", e));
            false
        }
    }
}

fn print_troubleshooting(theme: &Theme, platform: OsPlatform, profile: &Profile) {
    let mut steps = vec![format!(
        "Make sure the public key is added at {}",
        GITHUB_SSH_SETTINGS_URL
    )];
    steps.extend(platform.ssh_tips().iter().map(|tip| tip.to_string()));
    steps.push(format!("Check the key is on the '{}' account", profile.name));
    steps.push(format!(
        "Retry manually: ssh -T git@{}",
        ssh_host_alias(&profile.name)
    ));

    println!();
    println!("{}", theme.bold("Troubleshooting:"));
    for (i, step) in steps.iter().enumerate() {
        println!("  {}. {}", i + 1, step);
    }
}

pub fn cmd_remote(app: &App, name: Option<String>) -> Result<()> {
    if !git::is_git_repo(Path::new(".")) {
        bail!("Not in a Git repository");
    }

    let name = match name {
        Some(n) => {
            app.manager.get(&n)?;
            n
        }
        None => match app.manager.active_profile() {
            Some((n, _)) => n,
            None => bail!("Current Git config does not match any profile. Switch to one first."),
        },
    };

    let url = remote::rewrite_for_profile(Path::new("."), &name)?;
    app.theme.success(&format!(
        "Origin for profile '{}' is now {}",
        app.theme.cyan(&name),
        app.theme.cyan(&url)
    ));
    Ok(())
}

pub fn cmd_update(app: &App) -> Result<()> {
    let theme = &app.theme;
    theme.info(&format!("Current version: {}", update::VERSION));
    theme.info("Checking for updates...");

    let latest = match update::fetch_latest() {
        Ok(latest) => latest,
        Err(e) => {
            theme.warning(&format!("{:#}", e));
            println!("Check manually at {}", update::RELEASES_URL);
            return Ok(());
        }
    };

    if latest.is_newer_than(update::VERSION) {
        theme.success(&format!("New version available: {}", theme.green(&latest.version.to_string())));
        println!(
            "Download it from {}",
            latest.url.as_deref().unwrap_or(update::RELEASES_URL)
        );
    } else {
        theme.success("You are on the latest version");
    }
    Ok(())
}
