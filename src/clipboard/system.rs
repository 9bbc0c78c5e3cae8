use anyhow::{anyhow, Result};

pub struct SystemClipboard(arboard::Clipboard);

impl SystemClipboard {
    pub fn new(clipboard: arboard::Clipboard) -> Self {
        Self(clipboard)
    }

    /// On Linux both the clipboard and the primary selection are written.
    #[cfg(target_os = "linux")]
    pub fn set_contents(&mut self, contents: String) -> Result<()> {
        use arboard::{LinuxClipboardKind, SetExtLinux};

        let errors: Vec<String> = [
            ("clipboard", LinuxClipboardKind::Clipboard),
            ("primary", LinuxClipboardKind::Primary),
        ]
        .into_iter()
        .filter_map(|(name, kind)| {
            self.0
                .set()
                .clipboard(kind)
                .text(contents.clone())
                .err()
                .map(|err| format!("{}: {}", name, err))
        })
        .collect();

        if errors.is_empty() {
            Ok(())
        } else {
            Err(anyhow!("{}", errors.join(", ")))
        }
    }

    #[cfg(not(target_os = "linux"))]
    pub fn set_contents(&mut self, contents: String) -> Result<()> {
        self.0.set_text(contents)?;
        Ok(())
    }
}

impl std::fmt::Debug for SystemClipboard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SystemClipboard")
    }
}
