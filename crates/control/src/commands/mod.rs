pub mod executor;
pub mod types;

pub use executor::CommandExecutor;
pub use types::{Command, Response};
