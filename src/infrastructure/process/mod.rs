pub mod command_executor;
pub mod dispatcher;

pub use command_executor::{CommandExecutor, DEFAULT_GRACE_PERIOD};
pub use dispatcher::{Dispatcher, ParallelConfig};
