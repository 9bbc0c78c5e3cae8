mod osc52;
mod system;

use crate::{cmd::ClipboardMode, error::SessionError, logger};

use osc52::Osc52Clipboard;
use system::SystemClipboard;

/// Where "copy" puts the log buffer.
#[derive(Debug)]
pub enum Clipboard {
    System(SystemClipboard),
    Osc52(Osc52Clipboard),
}

impl Clipboard {
    pub fn new(mode: ClipboardMode) -> Option<Self> {
        match mode {
            ClipboardMode::System => Self::system(),
            ClipboardMode::Osc52 => Some(Self::osc52()),
            ClipboardMode::Auto => Some(Self::detect()),
        }
    }

    fn system() -> Option<Self> {
        match arboard::Clipboard::new() {
            Ok(cb) => {
                logger!(info, "Using system clipboard");
                Some(Clipboard::System(SystemClipboard::new(cb)))
            }
            Err(err) => {
                logger!(error, "Failed to open system clipboard: {}", err);
                None
            }
        }
    }

    fn osc52() -> Self {
        logger!(info, "Using OSC 52 clipboard");
        Clipboard::Osc52(Osc52Clipboard::new())
    }

    /// OSC 52 over SSH, otherwise the system clipboard when it can be opened.
    fn detect() -> Self {
        if is_ssh_session() {
            logger!(info, "SSH session detected");
            return Self::osc52();
        }

        Self::system().unwrap_or_else(Self::osc52)
    }

    pub fn set_contents(&mut self, contents: String) -> Result<(), SessionError> {
        let ret = match self {
            Clipboard::System(cb) => cb.set_contents(contents),
            Clipboard::Osc52(cb) => cb.set_contents(contents),
        };

        ret.map_err(|err| SessionError::ClipboardFailed(err.to_string()))
    }
}

fn is_ssh_session() -> bool {
    ["SSH_CONNECTION", "SSH_CLIENT", "SSH_TTY"]
        .iter()
        .any(|var| std::env::var_os(var).is_some())
}
