use colored::{ColoredString, Colorize};
use std::io::IsTerminal;

/// Terminal styling chosen once at startup and handed to every printer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Theme {
    color: bool,
}

impl Theme {
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    /// Color only when stdout is a terminal and nobody opted out
    pub fn detect(no_color_flag: bool) -> Self {
        let opted_out = no_color_flag || std::env::var_os("NO_COLOR").is_some();
        Self::new(!opted_out && std::io::stdout().is_terminal())
    }

    fn paint(&self, text: &str, style: fn(&str) -> ColoredString) -> String {
        if self.color {
            style(text).to_string()
        } else {
            text.to_string()
        }
    }

    pub fn green(&self, text: &str) -> String {
        self.paint(text, |s| s.green())
    }

    pub fn yellow(&self, text: &str) -> String {
        self.paint(text, |s| s.yellow())
    }

    pub fn red(&self, text: &str) -> String {
        self.paint(text, |s| s.red())
    }

    pub fn cyan(&self, text: &str) -> String {
        self.paint(text, |s| s.cyan())
    }

    pub fn blue(&self, text: &str) -> String {
        self.paint(text, |s| s.blue())
    }

    pub fn bold(&self, text: &str) -> String {
        self.paint(text, |s| s.bold())
    }

    pub fn dimmed(&self, text: &str) -> String {
        self.paint(text, |s| s.dimmed())
    }

    pub fn success(&self, message: &str) {
        println!("{} {}", self.paint("Success:", |s| s.green().bold()), message);
    }

    pub fn error(&self, message: &str) {
        eprintln!("{} {}", self.paint("Error:", |s| s.red().bold()), message);
    }

    pub fn warning(&self, message: &str) {
        println!("{} {}", self.paint("Warning:", |s| s.yellow().bold()), message);
    }

    pub fn info(&self, message: &str) {
        println!("{} {}", self.paint("Info:", |s| s.cyan().bold()), message);
    }

    pub fn header(&self, title: &str) {
        println!();
        println!("{}", self.bold(&format!("=== {} ===", title)));
    }
}
