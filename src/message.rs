use crate::{
    session::{PodKey, StreamEvent},
    workers::ViewEvent,
};

/// A command typed by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserCommand {
    Contexts,
    UseContext(String),
    Pods,
    Refresh,
    Namespaces,
    Namespace(String),
    Select(PodKey),
    Deselect,
    Start,
    Stop,
    Search(String),
    Logs,
    Clear,
    Copy,
    Describe(PodKey),
    Status,
    Help,
    Quit,
}

impl From<UserCommand> for Message {
    fn from(cmd: UserCommand) -> Self {
        Self::User(cmd)
    }
}

impl From<ViewEvent> for Message {
    fn from(ev: ViewEvent) -> Self {
        Self::View(ev)
    }
}

#[derive(Debug)]
pub enum Message {
    User(UserCommand),
    Stream(StreamEvent),
    View(ViewEvent),
    Error(anyhow::Error),
}

#[macro_export]
macro_rules! panic_set_hook {
    ($t:tt) => {
        use std::panic;
        let default_hook = panic::take_hook();

        panic::set_hook(Box::new(move |info| {
            $t;

            default_hook(info);
        }));
    };
}
