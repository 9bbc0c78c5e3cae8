use anyhow::Result;
use crossbeam::channel::Sender;

use crate::{
    logger,
    message::{Message, UserCommand},
};

/// Routes Ctrl-C into the session as a quit so the live stream is closed
/// before the process exits.
pub fn signal_handler(tx: Sender<Message>) -> Result<()> {
    ctrlc::set_handler(move || {
        logger!(info, "Received interrupt");

        if tx.send(UserCommand::Quit.into()).is_err() {
            std::process::exit(130);
        }
    })?;

    Ok(())
}
