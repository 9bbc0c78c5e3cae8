mod args;
mod command;

pub use self::args::ClipboardMode;
pub use self::command::*;
