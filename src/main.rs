use anyhow::Result;

use podwatch::{app::App, cmd::Command, config::Config, logging::Logger};

fn main() -> Result<()> {
    let cmd = Command::init();

    if cmd.logging {
        Logger::init()?;
    }

    let config = Config::load(cmd.config_load_option()?)?;

    App::run(cmd, config)
}
