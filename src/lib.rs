pub mod app;
pub mod clipboard;
pub mod cmd;
pub mod config;
pub mod error;
pub mod kube;
pub mod logging;
pub mod message;
pub mod session;
pub mod signal;
pub mod util;
pub mod workers;
