use std::io::Write;
use std::process::{Command, Stdio};

/// Page where a new SSH key is registered
pub const GITHUB_SSH_SETTINGS_URL: &str = "https://github.com/settings/ssh/new";

/// Operating-system family, detected once at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OsPlatform {
    MacOs,
    Windows,
    Linux,
    Unsupported,
}

impl OsPlatform {
    pub fn detect() -> Self {
        Self::from_os(std::env::consts::OS)
    }

    pub fn from_os(os: &str) -> Self {
        match os {
            "macos" => OsPlatform::MacOs,
            "windows" => OsPlatform::Windows,
            "linux" | "freebsd" | "openbsd" | "netbsd" | "dragonfly" => OsPlatform::Linux,
            _ => OsPlatform::Unsupported,
        }
    }

    /// Clipboard programs to try in order, each reading the text on stdin
    fn clipboard_commands(&self) -> &'static [&'static [&'static str]] {
        match self {
            OsPlatform::MacOs => &[&["pbcopy"]],
            OsPlatform::Windows => &[&["clip"]],
            OsPlatform::Linux => &[
                &["xclip", "-selection", "clipboard"],
                &["xsel", "--clipboard", "--input"],
                &["wl-copy"],
            ],
            OsPlatform::Unsupported => &[],
        }
    }

    /// Copy text to the clipboard; false if no helper program worked
    pub fn copy_to_clipboard(&self, text: &str) -> bool {
        self.clipboard_commands()
            .iter()
            .any(|argv| pipe_to(argv, text))
    }

    fn opener(&self, url: &str) -> Option<Command> {
        let mut command = match self {
            OsPlatform::MacOs => Command::new("open"),
            OsPlatform::Windows => {
                let mut c = Command::new("cmd");
                c.args(["/C", "start", ""]);
                c
            }
            OsPlatform::Linux => Command::new("xdg-open"),
            OsPlatform::Unsupported => return None,
        };
        command.arg(url);
        Some(command)
    }

    /// Open a URL in the default browser; false if that failed
    pub fn open_url(&self, url: &str) -> bool {
        let Some(mut command) = self.opener(url) else {
            return false;
        };
        command
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }

    pub fn paste_hint(&self) -> &'static str {
        match self {
            OsPlatform::MacOs => "You can paste it with Cmd+V",
            _ => "You can paste it with Ctrl+V",
        }
    }

    /// How to get a missing required tool
    pub fn install_advice(&self, tool: &str) -> &'static str {
        match (tool, self) {
            ("git", _) => "Please install Git: https://git-scm.com/downloads",
            (_, OsPlatform::Windows) => {
                "Please install the OpenSSH client (Windows 10+) or Git for Windows"
            }
            _ => "Please install the OpenSSH client",
        }
    }

    /// Connection troubleshooting that depends on the OS
    pub fn ssh_tips(&self) -> &'static [&'static str] {
        match self {
            OsPlatform::Windows => &[
                "Ensure the OpenSSH client is installed (Windows 10+)",
                "Try running from Git Bash if using Git for Windows",
            ],
            _ => &["Check SSH key permissions (chmod 600 on the private key)"],
        }
    }
}

/// True if `program` can be started from PATH
pub fn is_installed(program: &str) -> bool {
    let spawned = Command::new(program)
        .arg("--version")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();
    match spawned {
        Ok(_) => true,
        Err(e) => {
            tracing::debug!("{} is not runnable: {}", program, e);
            false
        }
    }
}

/// The tools from `tools` that cannot be started
pub fn missing_tools<'a>(tools: &[&'a str]) -> Vec<&'a str> {
    tools.iter().copied().filter(|tool| !is_installed(tool)).collect()
}

fn pipe_to(argv: &[&str], text: &str) -> bool {
    let Some((program, args)) = argv.split_first() else {
        return false;
    };

    tracing::debug!("copying to clipboard with {}", program);
    let child = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn();

    let Ok(mut child) = child else {
        return false;
    };

    let written = child
        .stdin
        .take()
        .map(|mut stdin| stdin.write_all(text.as_bytes()).is_ok())
        .unwrap_or(false);

    let exited_ok = child.wait().map(|s| s.success()).unwrap_or(false);
    written && exited_ok
}
