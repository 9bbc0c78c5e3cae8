use std::io::{self, Write};

use anyhow::Result;
use base64::{engine::general_purpose::STANDARD, Engine as _};

/// Clipboard writes through the terminal's OSC 52 escape sequence.
#[derive(Debug)]
pub struct Osc52Clipboard {
    multiplexer: Multiplexer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Multiplexer {
    Tmux,
    Screen,
    None,
}

impl Multiplexer {
    fn detect() -> Self {
        if std::env::var_os("TMUX").is_some() {
            return Self::Tmux;
        }

        match std::env::var("TERM") {
            Ok(term) if term.starts_with("screen") => Self::Screen,
            _ => Self::None,
        }
    }

    /// Multiplexers only pass the sequence on inside a DCS passthrough with ESC doubled.
    fn wrap(self, osc: String) -> String {
        match self {
            Self::Tmux => format!("\x1bPtmux;{}\x1b\\", osc.replace('\x1b', "\x1b\x1b")),
            Self::Screen => format!("\x1bP{}\x1b\\", osc.replace('\x1b', "\x1b\x1b")),
            Self::None => osc,
        }
    }
}

fn sequence(multiplexer: Multiplexer, contents: &str) -> String {
    multiplexer.wrap(format!("\x1b]52;c;{}\x07", STANDARD.encode(contents)))
}

impl Osc52Clipboard {
    pub fn new() -> Self {
        Self {
            multiplexer: Multiplexer::detect(),
        }
    }

    pub fn set_contents(&mut self, contents: String) -> Result<()> {
        let mut stdout = io::stdout();

        stdout.write_all(sequence(self.multiplexer, &contents).as_bytes())?;
        stdout.flush()?;

        Ok(())
    }
}
