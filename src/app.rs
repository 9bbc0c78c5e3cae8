use std::thread;

use anyhow::Result;
use crossbeam::channel::{bounded, unbounded, Receiver, Sender};

use crate::{
    cmd::Command,
    config::Config,
    logger,
    message::Message,
    signal::signal_handler,
    workers::{Render, SessionWorker, UserInput},
};

pub struct App;

impl App {
    pub fn run(cmd: Command, config: Config) -> Result<()> {
        let session_config = cmd.session_worker_config(&config);

        // Input and session output meet in the render thread; commands and
        // log lines meet in the session thread.
        let (tx_render, rx_render): (Sender<Message>, Receiver<Message>) = unbounded();
        let (tx_session, rx_session): (Sender<Message>, Receiver<Message>) = unbounded();

        let (tx_shutdown, rx_shutdown) = bounded::<Result<()>>(1);

        signal_handler(tx_session.clone())?;

        let user_input = UserInput::new(tx_render.clone(), tx_shutdown.clone());

        let session = SessionWorker::new(
            tx_render.clone(),
            tx_session.clone(),
            rx_session,
            tx_shutdown.clone(),
            session_config,
        );

        let render = Render::new(tx_session, rx_render, tx_shutdown.clone(), cmd.clipboard);

        logger!(info, "app start");

        thread::spawn(move || {
            session.set_panic_hook();
            session.start();
        });

        thread::spawn(move || {
            user_input.set_panic_hook();
            user_input.start();
        });

        thread::spawn(move || {
            render.set_panic_hook();
            render.start();
        });

        let result = rx_shutdown.recv()?;

        logger!(info, "app end");

        result
    }
}
