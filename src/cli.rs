use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "gitswitch")]
#[command(author, version, about = "Switch between multiple GitHub identities and their SSH keys")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Opens the interactive menu when omitted
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Profile store file [default: ~/.git_profiles.json]
    #[arg(long, global = true, env = "GITSWITCH_STORE", value_name = "FILE")]
    pub store: Option<PathBuf>,

    /// SSH directory holding keys, config and known_hosts [default: ~/.ssh]
    #[arg(long, global = true, env = "GITSWITCH_SSH_DIR", value_name = "DIR")]
    pub ssh_dir: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a profile with a new SSH key and activate it
    Add {
        /// Profile name, also the GitHub username (prompted if omitted)
        name: Option<String>,

        /// Git email (prompted if omitted)
        #[arg(long)]
        email: Option<String>,

        /// Generate the key without asking for a passphrase
        #[arg(long)]
        no_passphrase: bool,

        /// Skip the GitHub key registration walkthrough
        #[arg(long)]
        skip_setup: bool,
    },

    /// Make a profile the global Git identity
    Use {
        /// Profile name (interactive if not provided)
        name: Option<String>,

        /// Leave the current repository's origin URL untouched
        #[arg(long)]
        no_remote: bool,

        /// Skip the GitHub connection test
        #[arg(long)]
        no_test: bool,
    },

    /// Delete a profile, its SSH key and its SSH config entry
    Remove {
        /// Profile name to remove (interactive if not provided)
        name: Option<String>,

        /// Skip confirmation prompts
        #[arg(short, long)]
        yes: bool,
    },

    /// List all configured profiles
    List,

    /// Show the current global Git identity
    Current {
        /// Print only the matching profile name, for shell prompts
        #[arg(long)]
        porcelain: bool,
    },

    /// Test SSH authentication with GitHub
    Test {
        /// Profile name (interactive if not provided)
        name: Option<String>,

        /// Test every profile
        #[arg(short, long, conflicts_with = "name")]
        all: bool,
    },

    /// Point this repository's origin at a profile's SSH host alias
    Remote {
        /// Profile name [default: the active profile]
        name: Option<String>,
    },

    /// Check for a newer release
    Update,

    /// Open the interactive menu
    Menu,
}

/// External tools a command cannot work without; `None` is the menu
pub fn required_tools(command: Option<&Commands>) -> &'static [&'static str] {
    match command {
        None | Some(Commands::Menu) | Some(Commands::Add { .. }) => &["git", "ssh-keygen"],
        Some(Commands::Use { .. })
        | Some(Commands::Remove { .. })
        | Some(Commands::List)
        | Some(Commands::Current { .. })
        | Some(Commands::Remote { .. }) => &["git"],
        Some(Commands::Test { .. }) | Some(Commands::Update) => &[],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_use() {
        let cli = Cli::try_parse_from(["gitswitch", "use", "work", "--no-test"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Use { name: Some(ref n), no_remote: false, no_test: true }) if n == "work"
        ));
    }

    #[test]
    fn test_no_subcommand_means_menu() {
        let cli = Cli::try_parse_from(["gitswitch", "--no-color"]).unwrap();
        assert!(cli.command.is_none());
        assert!(cli.global.no_color);
    }

    #[test]
    fn test_all_conflicts_with_name() {
        assert!(Cli::try_parse_from(["gitswitch", "test", "work", "--all"]).is_err());
    }

    #[test]
    fn test_required_tools() {
        let parse = |args: &[&str]| Cli::try_parse_from(args).unwrap().command;

        assert_eq!(required_tools(None), ["git", "ssh-keygen"]);
        assert_eq!(
            required_tools(parse(&["gitswitch", "add", "work"]).as_ref()),
            ["git", "ssh-keygen"]
        );
        assert_eq!(required_tools(parse(&["gitswitch", "list"]).as_ref()), ["git"]);
        assert!(required_tools(parse(&["gitswitch", "update"]).as_ref()).is_empty());
    }
}
