mod clipboard_mode;

pub use clipboard_mode::*;
