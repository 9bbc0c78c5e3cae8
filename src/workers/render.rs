mod printer;

use std::{
    io::{self, Write},
    time::{Duration, Instant},
};

use anyhow::Result;
use chrono::Utc;
use crossbeam::channel::{Receiver, Sender};

use crate::{
    clipboard::Clipboard,
    cmd::ClipboardMode,
    logger,
    message::{Message, UserCommand},
    panic_set_hook,
    workers::ViewEvent,
};

use self::printer::Printer;

const COPIED_DURATION: Duration = Duration::from_secs(2);

/// Prints what the session reports and forwards user commands to it.
pub struct Render {
    tx: Sender<Message>,
    rx: Receiver<Message>,
    tx_shutdown: Sender<Result<()>>,
    clipboard: ClipboardMode,
}

impl Render {
    pub fn new(
        tx: Sender<Message>,
        rx: Receiver<Message>,
        tx_shutdown: Sender<Result<()>>,
        clipboard: ClipboardMode,
    ) -> Self {
        Self {
            tx,
            rx,
            tx_shutdown,
            clipboard,
        }
    }

    pub fn start(self) {
        logger!(info, "render start");

        let ret = self.render();

        logger!(info, "render end");

        if let Err(e) = ret {
            logger!(error, "{}", e);

            self.tx_shutdown
                .send(Err(e))
                .expect("failed to send shutdown signal");
        }
    }

    pub fn set_panic_hook(&self) {
        let tx_shutdown = self.tx_shutdown.clone();

        panic_set_hook!({
            tx_shutdown
                .send(Err(anyhow::anyhow!("panic occurred in Render worker")))
                .expect("failed to send shutdown signal");
        });
    }

    fn render(&self) -> Result<()> {
        let mut screen = Screen::new(
            Printer::new(io::stdout()),
            Clipboard::new(self.clipboard),
            self.tx.clone(),
        );

        screen.printer.help()?;

        for msg in self.rx.iter() {
            screen.handle(msg)?;
        }

        Ok(())
    }
}

struct Screen<W: Write> {
    printer: Printer<W>,
    clipboard: Option<Clipboard>,
    copied_at: Option<Instant>,
    tx: Sender<Message>,
}

impl<W: Write> Screen<W> {
    fn new(printer: Printer<W>, clipboard: Option<Clipboard>, tx: Sender<Message>) -> Self {
        Self {
            printer,
            clipboard,
            copied_at: None,
            tx,
        }
    }

    fn handle(&mut self, msg: Message) -> Result<()> {
        match msg {
            Message::User(UserCommand::Help) => self.printer.help()?,
            Message::User(cmd) => self.tx.send(cmd.into())?,
            Message::View(ev) => self.view(ev)?,
            Message::Error(err) => self.printer.failed(&err.to_string())?,
            Message::Stream(_) => {}
        }

        Ok(())
    }

    fn view(&mut self, ev: ViewEvent) -> Result<()> {
        match ev {
            ViewEvent::Contexts { contexts, current } => {
                self.printer.contexts(&contexts, &current)
            }
            ViewEvent::Pods(view) => self.printer.pods(&view, Utc::now()),
            ViewEvent::Namespaces {
                namespaces,
                selected,
            } => self.printer.namespaces(&namespaces, &selected),
            ViewEvent::Logs(lines) => self.printer.logs(&lines),
            ViewEvent::LogLine(line) => self.printer.log_line(&line),
            ViewEvent::Stream(session) => self.printer.stream(&session),
            ViewEvent::Describe { pod, yaml } => self.printer.describe(&pod, &yaml),
            ViewEvent::CopyAll(contents) => self.copy(contents),
            ViewEvent::Status(status) => self.printer.status(&status, self.recently_copied()),
            ViewEvent::Notice(notice) => self.printer.notice(&notice),
            ViewEvent::Failed(message) => self.printer.failed(&message),
        }
    }

    /// Clipboard failures only end up in the log.
    fn copy(&mut self, contents: String) -> Result<()> {
        let Some(clipboard) = self.clipboard.as_mut() else {
            logger!(error, "Clipboard is not available");
            return Ok(());
        };

        match clipboard.set_contents(contents) {
            Ok(()) => {
                self.copied_at = Some(Instant::now());
                self.printer.notice("Copied!")
            }
            Err(err) => {
                logger!(error, "{}", err);
                Ok(())
            }
        }
    }

    fn recently_copied(&self) -> bool {
        self.copied_at
            .is_some_and(|at| at.elapsed() < COPIED_DURATION)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{session::PodKey, workers::StatusView};
    use crossbeam::channel::unbounded;
    use pretty_assertions::assert_eq;

    fn screen() -> (Screen<Vec<u8>>, Receiver<Message>) {
        let (tx, rx) = unbounded();
        (Screen::new(Printer::new(Vec::new()), None, tx), rx)
    }

    fn output(screen: &Screen<Vec<u8>>) -> String {
        String::from_utf8(screen.printer.get_ref().clone()).unwrap()
    }

    #[test]
    fn user_commands_are_forwarded() {
        let (mut screen, rx) = screen();

        screen
            .handle(UserCommand::Select(PodKey::new("default", "web")).into())
            .unwrap();
        screen.handle(UserCommand::Quit.into()).unwrap();

        let forwarded: Vec<_> = rx
            .try_iter()
            .map(|msg| match msg {
                Message::User(cmd) => cmd,
                _ => unreachable!(),
            })
            .collect();

        assert_eq!(
            forwarded,
            vec![
                UserCommand::Select(PodKey::new("default", "web")),
                UserCommand::Quit
            ]
        );
    }

    #[test]
    fn help_is_printed_locally() {
        let (mut screen, rx) = screen();

        screen.handle(UserCommand::Help.into()).unwrap();

        assert!(rx.try_recv().is_err());
        assert!(output(&screen).contains("select <namespace>/<pod>"));
    }

    #[test]
    fn copy_without_clipboard_is_not_an_error() {
        let (mut screen, _rx) = screen();

        screen
            .handle(ViewEvent::CopyAll("a\nb".into()).into())
            .unwrap();

        assert!(!screen.recently_copied());
        assert_eq!(output(&screen), "");
    }

    #[test]
    fn copied_is_shown_for_a_while() {
        let (mut screen, _rx) = screen();

        screen.copied_at = Some(Instant::now());
        assert!(screen.recently_copied());

        screen.copied_at = Instant::now().checked_sub(COPIED_DURATION);
        assert!(!screen.recently_copied());
    }

    #[test]
    fn status_mentions_copy_while_recent() {
        let (mut screen, _rx) = screen();
        screen.copied_at = Some(Instant::now());

        screen
            .handle(ViewEvent::Status(StatusView::default()).into())
            .unwrap();

        assert!(output(&screen).contains("Copied!"));
    }

    #[test]
    fn errors_are_printed() {
        let (mut screen, _rx) = screen();

        screen
            .handle(Message::Error(anyhow::anyhow!("Unknown command: x")))
            .unwrap();

        assert!(output(&screen).contains("Unknown command: x"));
    }
}
