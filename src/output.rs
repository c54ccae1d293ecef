// Output module: everything the user sees on the terminal.
//
// Lines are laid out against the terminal width: the name on the left, the
// details (size, short URL, ID) flush right. When the width is unknown the
// details are separated by tabs instead.

use crossterm::style::Stylize;
use std::io::{self, IsTerminal, Stderr, Stdout, Write};

use crate::error::Error;
use crate::model::{CrateInfo, FileInfo, Id};

/// Where the line width comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Width {
    /// Ask the terminal on every line so resizes are picked up.
    Detect,
    Fixed(usize),
    /// Not a terminal: use the tab-separated layout.
    Unknown,
}

impl Width {
    pub fn columns(self) -> Option<usize> {
        match self {
            Width::Detect => crossterm::terminal::size()
                .ok()
                .map(|(cols, _)| cols as usize)
                .filter(|&c| c > 0),
            Width::Fixed(n) => Some(n),
            Width::Unknown => None,
        }
    }
}

/// Human readable size using SI units (powers of 1000).
pub fn byte_count(bytes: u64) -> String {
    const UNIT: u64 = 1000;
    const PREFIXES: [&str; 6] = ["k", "M", "G", "T", "P", "E"];
    if bytes < UNIT {
        return format!("{bytes} B");
    }
    let mut exp = 0;
    let mut scale = 1u64;
    while exp < PREFIXES.len() && bytes / scale >= UNIT {
        scale *= UNIT;
        exp += 1;
    }
    format!("{:.1} {}B", bytes as f64 / scale as f64, PREFIXES[exp - 1])
}

/// Shorten `name` to `len` characters by cutting out the middle.
pub fn truncate_middle(name: &str, len: usize) -> String {
    let chars: Vec<char> = name.chars().collect();
    if chars.len() <= len {
        return name.to_owned();
    }
    if len <= 3 {
        return chars[..len].iter().collect();
    }
    let kept = len - 3;
    let head = (kept + 1) / 2;
    let tail = kept - head;
    let mut out: String = chars[..head].iter().collect();
    out.push_str("...");
    out.extend(&chars[chars.len() - tail..]);
    out
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// `prefix + name`, then `data` right-aligned to `width`. The name is cut
/// in the middle when the line would not fit.
pub fn aligned_line(prefix: &str, name: &str, data: &str, width: Option<usize>) -> String {
    match width {
        None => format!("{prefix}{name}\t\t{data}"),
        Some(width) => {
            let room = width.saturating_sub(char_len(data) + char_len(prefix));
            let name = if char_len(name) > room {
                truncate_middle(name, room)
            } else {
                name.to_owned()
            };
            let pad = width.saturating_sub(char_len(prefix) + char_len(&name));
            format!("{prefix}{name}{data:>pad$}")
        }
    }
}

/// Layout switches that come from the command line.
#[derive(Debug, Clone)]
pub struct Settings {
    pub width: Width,
    pub quiet: bool,
    pub show_ids: bool,
    pub color: bool,
    pub short_links: String,
}

impl Settings {
    /// Settings for the real terminal.
    pub fn terminal(quiet: bool, show_ids: bool, short_links: &str) -> Self {
        let tty = io::stdout().is_terminal();
        Settings {
            width: if tty { Width::Detect } else { Width::Unknown },
            quiet,
            show_ids,
            color: tty && io::stderr().is_terminal(),
            short_links: short_links.to_owned(),
        }
    }
}

/// Writes formatted lines to stdout/stderr (or any pair of writers).
pub struct Printer<O = Stdout, E = Stderr> {
    pub out: O,
    pub err: E,
    pub settings: Settings,
}

impl Printer {
    pub fn stdio(settings: Settings) -> Self {
        Printer {
            out: io::stdout(),
            err: io::stderr(),
            settings,
        }
    }
}

impl<O: Write, E: Write> Printer<O, E> {
    pub fn new(out: O, err: E, settings: Settings) -> Self {
        Printer { out, err, settings }
    }

    pub fn width(&self) -> Option<usize> {
        self.settings.width.columns()
    }

    /// Print to stdout unless quiet. Broken pipes are ignored.
    pub fn echo(&mut self, line: &str) {
        if !self.settings.quiet {
            let _ = writeln!(self.out, "{line}");
        }
    }

    fn paint(&self, text: &str, color: fn(&str) -> String) -> String {
        if self.settings.color {
            color(text)
        } else {
            text.to_owned()
        }
    }

    fn link_data(&self, short_code: &str, id: Id) -> String {
        let mut data = format!("  URL: {}{}", self.settings.short_links, short_code);
        if self.settings.show_ids {
            data.push_str(&format!("  ID: {id}"));
        }
        data
    }

    pub fn crate_line(&self, name: &str, short_code: &str, id: Id) -> String {
        aligned_line("", name, &self.link_data(short_code, id), self.width())
    }

    pub fn file_line(&self, name: &str, size: Option<u64>, short_code: &str, id: Id) -> String {
        let size = size.map(byte_count).unwrap_or_default();
        let data = format!("  {size}{}", self.link_data(short_code, id));
        aligned_line("* ", name, &data, self.width())
    }

    pub fn krate(&mut self, c: &CrateInfo) {
        let line = self.crate_line(&c.name, &c.short_code, c.id);
        self.echo(&line);
    }

    pub fn file(&mut self, f: &FileInfo) {
        let line = self.file_line(&f.name, f.size, &f.short_code, f.id);
        self.echo(&line);
    }

    /// A crate header followed by its files, preceded by a blank line.
    pub fn crate_with_files(&mut self, c: &CrateInfo) {
        self.echo("");
        self.krate(c);
        if c.is_empty() {
            self.echo("* Crate is empty.");
        } else {
            for f in c.files() {
                self.file(f);
            }
        }
    }

    pub fn header(&mut self, pattern: &str) {
        let line = self.paint(&format!("{pattern}:"), |s| s.to_owned().green().to_string());
        self.echo(&line);
    }

    pub fn downloaded(&mut self, name: &str) {
        let name = match self.width() {
            Some(w) if char_len(name) > w.saturating_sub(12) => truncate_middle(name, w.saturating_sub(12)),
            _ => name.to_owned(),
        };
        self.echo(&format!("{name} downloaded."));
    }

    /// `Error: <message>` with `<argument>` flush right.
    pub fn error_line(&self, message: &str, argument: Option<&str>) -> String {
        let label = self.paint("Error: ", |s| s.to_owned().red().to_string());
        match (argument, self.width()) {
            (None, _) => format!("{label}{message}"),
            (Some(arg), None) => format!("{label}{message}\t<{arg}>"),
            (Some(arg), Some(width)) => {
                let tag = format!("<{arg}>");
                let pad = width.saturating_sub(char_len(message) + 7);
                format!("{label}{message}{tag:>pad$}")
            }
        }
    }

    pub fn error(&mut self, message: &str, argument: Option<&str>) {
        let line = self.error_line(message, argument);
        let _ = writeln!(self.err, "{line}");
    }

    /// Report a library error, with its argument and hint.
    pub fn report(&mut self, err: &Error) {
        let argument = err.argument();
        let message = match err {
            Error::ListingUnavailable(cause) => {
                self.report(cause);
                err.to_string()
            }
            _ => err.to_string(),
        };
        self.error(&message, argument.as_deref());
        if let Some(hint) = err.hint() {
            let _ = writeln!(self.err, "{hint}");
        }
    }

    pub fn warning(&mut self, message: &str) {
        let label = self.paint("Warning: ", |s| s.to_owned().yellow().to_string());
        let _ = writeln!(self.err, "{label}{message}");
    }
}

#[cfg(test)]
pub(crate) fn test_printer(width: Width, show_ids: bool) -> Printer<Vec<u8>, Vec<u8>> {
    Printer::new(
        Vec::new(),
        Vec::new(),
        Settings {
            width,
            quiet: false,
            show_ids,
            color: false,
            short_links: "http://lts.cr/".into(),
        },
    )
}

#[cfg(test)]
impl Printer<Vec<u8>, Vec<u8>> {
    pub fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.out).into_owned()
    }

    pub fn stderr_text(&self) -> String {
        String::from_utf8_lossy(&self.err).into_owned()
    }
}
