pub mod command;
pub mod state;

pub use command::*;
pub use state::*;
