use crate::git::GlobalIdentity;
use crate::ui::Theme;
use crate::{cmd_add, cmd_remote, cmd_remove, cmd_test, cmd_update, cmd_use, App};
use anyhow::Result;
use inquire::{Confirm, InquireError, Password, Select, Text};
use std::fmt;

const BACK_OPTION: &str = "<- back";
const DELETE_WORD: &str = "DELETE";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MainAction {
    Add,
    Switch(usize),
    Remove,
    Settings,
    Exit,
}

impl fmt::Display for MainAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MainAction::Add => write!(f, "Add new profile"),
            MainAction::Switch(count) => write!(f, "Switch profile ({} available)", count),
            MainAction::Remove => write!(f, "Remove profile"),
            MainAction::Settings => write!(f, "Settings"),
            MainAction::Exit => write!(f, "Exit"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SettingsAction {
    TestOne,
    TestAll,
    UpdateRemote,
    CheckUpdates,
    Back,
}

impl fmt::Display for SettingsAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingsAction::TestOne => write!(f, "Test GitHub connection"),
            SettingsAction::TestAll => write!(f, "Test all profiles"),
            SettingsAction::UpdateRemote => write!(f, "Update repository URL"),
            SettingsAction::CheckUpdates => write!(f, "Check for updates"),
            SettingsAction::Back => write!(f, "Back"),
        }
    }
}

/// Interactive menu loop. Only Ctrl-C or "Exit" leaves it.
pub fn run(app: &App) -> Result<()> {
    loop {
        print_status(app);

        let count = app.manager.profiles().len();
        let actions = vec![
            MainAction::Add,
            MainAction::Switch(count),
            MainAction::Remove,
            MainAction::Settings,
            MainAction::Exit,
        ];

        let action = match Select::new("Select action:", actions).prompt() {
            Ok(action) => action,
            Err(InquireError::OperationCanceled) => continue,
            Err(e) => return Err(e.into()),
        };

        let result = match action {
            MainAction::Add => cmd_add(app, None, None, false, false),
            MainAction::Switch(_) => cmd_use(app, None, false, false),
            MainAction::Remove => cmd_remove(app, None, false),
            MainAction::Settings => settings(app),
            MainAction::Exit => {
                println!("Goodbye!");
                return Ok(());
            }
        };

        report(&app.theme, result)?;
    }
}

fn settings(app: &App) -> Result<()> {
    loop {
        let actions = vec![
            SettingsAction::TestOne,
            SettingsAction::TestAll,
            SettingsAction::UpdateRemote,
            SettingsAction::CheckUpdates,
            SettingsAction::Back,
        ];

        let result = match Select::new("Settings:", actions).prompt()? {
            SettingsAction::TestOne => cmd_test(app, None, false),
            SettingsAction::TestAll => cmd_test(app, None, true),
            SettingsAction::UpdateRemote => cmd_remote(app, None),
            SettingsAction::CheckUpdates => cmd_update(app),
            SettingsAction::Back => return Ok(()),
        };

        report(&app.theme, result)?;
    }
}

/// Print an action's failure and keep the menu alive; only an interrupt
/// escapes.
fn report(theme: &Theme, result: Result<()>) -> Result<()> {
    let Err(e) = result else {
        return Ok(());
    };

    match e.downcast_ref::<InquireError>() {
        Some(InquireError::OperationInterrupted) => Err(e),
        Some(InquireError::OperationCanceled) => {
            println!("Cancelled.");
            Ok(())
        }
        _ => {
            theme.error(&format!("{:#}", e));
            Ok(())
        }
    }
}

fn print_status(app: &App) {
    let theme = &app.theme;
    theme.header("Git Profile Manager");

    match app.manager.git().get_current() {
        Some(identity) => {
            println!("  User:    {} <{}>", theme.green(&identity.name), identity.email);
            match app.manager.active_profile() {
                Some((name, _)) => println!("  Profile: {}", theme.cyan(&name)),
                None => println!("  Profile: {}", theme.dimmed("(no matching profile)")),
            }
        }
        None => println!("  {}", theme.yellow("No Git identity configured")),
    }
    println!();
}

/// Ask until the validator accepts the trimmed input
pub fn prompt_valid<F>(theme: &Theme, message: &str, help: &str, validate: F) -> Result<String>
where
    F: Fn(&str) -> Result<()>,
{
    loop {
        let input = Text::new(message).with_help_message(help).prompt()?;
        let input = input.trim();

        match validate(input) {
            Ok(()) => return Ok(input.to_string()),
            Err(e) => theme.error(&e.to_string()),
        }
    }
}

/// Optional passphrase for a new key; empty means none
pub fn ask_passphrase() -> Result<String> {
    let wanted = Confirm::new("Protect the SSH key with a passphrase?")
        .with_default(false)
        .prompt()?;

    if !wanted {
        return Ok(String::new());
    }

    Ok(Password::new("Passphrase:")
        .with_custom_confirmation_message("Confirm passphrase:")
        .with_custom_confirmation_error_message("Passphrases do not match")
        .prompt()?)
}

/// Pick a stored profile; None when the user goes back or there are none
pub fn select_profile(app: &App, message: &str) -> Result<Option<String>> {
    let profiles = app.manager.profiles();
    if profiles.is_empty() {
        app.theme.info("No profiles configured. Add one first.");
        return Ok(None);
    }

    let active = app.manager.active_profile().map(|(name, _)| name);
    let options = build_profile_list(profiles.keys().map(String::as_str), active.as_deref());

    let selected = Select::new(message, options).prompt()?;
    if selected == BACK_OPTION {
        return Ok(None);
    }

    Ok(Some(strip_active_suffix(&selected).to_string()))
}

const ACTIVE_SUFFIX: &str = " (current)";

fn build_profile_list<'a>(names: impl Iterator<Item = &'a str>, active: Option<&str>) -> Vec<String> {
    let mut options: Vec<String> = names
        .map(|name| {
            if Some(name) == active {
                format!("{}{}", name, ACTIVE_SUFFIX)
            } else {
                name.to_string()
            }
        })
        .collect();
    options.push(BACK_OPTION.to_string());
    options
}

fn strip_active_suffix(option: &str) -> &str {
    option.strip_suffix(ACTIVE_SUFFIX).unwrap_or(option)
}

/// Typed confirmation followed by a yes/no
pub fn confirm_removal(name: &str) -> Result<bool> {
    let typed = Text::new(&format!(
        "Type '{}' to remove profile '{}':",
        DELETE_WORD, name
    ))
    .prompt()?;

    if !is_delete_word(&typed) {
        return Ok(false);
    }

    Ok(Confirm::new("Are you absolutely sure? This cannot be undone.")
        .with_default(false)
        .prompt()?)
}

fn is_delete_word(input: &str) -> bool {
    input.trim() == DELETE_WORD
}
