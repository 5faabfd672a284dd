use crate::config::{find_by_identity, Profiles};
use crate::profile::Identity;
use crate::ui::Theme;

/// Output the active profile name for shell prompts (porcelain mode)
pub fn output_porcelain(active: Option<&str>) {
    if let Some(profile_name) = active {
        println!("{}", profile_name);
    }
}

/// Output the global identity and the profile it belongs to
pub fn output_human(theme: &Theme, current: Option<&Identity>, profiles: &Profiles) {
    let Some(identity) = current else {
        println!();
        theme.warning("No Git configuration found!");
        return;
    };

    println!();
    println!("{}", theme.bold("Current Profile:"));
    println!("  Name:    {}", theme.green(&identity.name));
    println!("  Email:   {}", theme.blue(&identity.email));

    match find_by_identity(profiles, identity) {
        Some((profile_name, profile)) => {
            println!("  Profile: {}", theme.cyan(profile_name));
            if let Some(ref key) = profile.ssh_key {
                println!("  SSH Key: {}", key.display());
            }
        }
        None => println!("  {}", theme.dimmed("(no matching profile)")),
    }
}
