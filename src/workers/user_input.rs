mod parser;

pub use parser::parse_command;

use std::io::{self, BufRead};

use anyhow::Result;
use crossbeam::channel::Sender;

use crate::{
    logger,
    message::{Message, UserCommand},
    panic_set_hook,
};

/// Reads commands from stdin, one per line, and forwards them to the render thread.
pub struct UserInput {
    tx: Sender<Message>,
    tx_shutdown: Sender<Result<()>>,
}

impl UserInput {
    pub fn new(tx: Sender<Message>, tx_shutdown: Sender<Result<()>>) -> Self {
        Self { tx, tx_shutdown }
    }

    pub fn start(&self) {
        logger!(info, "user_input start");

        let ret = self.read(io::stdin().lock());

        logger!(info, "user_input end");

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
                .send(Err(anyhow::anyhow!("panic occurred in UserInput worker")))
                .expect("failed to send shutdown signal");
        });
    }

    /// Ends with a quit command once input is exhausted.
    fn read(&self, input: impl BufRead) -> Result<()> {
        for line in input.lines() {
            let line = line?;

            match parse_command(&line) {
                Ok(Some(cmd)) => {
                    let quit = cmd == UserCommand::Quit;

                    self.tx.send(cmd.into())?;

                    if quit {
                        return Ok(());
                    }
                }
                Ok(None) => {}
                Err(err) => self.tx.send(Message::Error(err))?,
            }
        }

        self.tx.send(UserCommand::Quit.into())?;

        Ok(())
    }
}
