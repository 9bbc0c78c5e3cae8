mod render;
mod session;
mod user_input;

pub use render::*;
pub use session::*;
pub use user_input::*;
