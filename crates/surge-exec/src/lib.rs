//! External-tool execution for surge.
//!
//! Every invocation borrows an exclusive [`Slot`] (a private session directory) from a fixed-size [`SlotPool`],
//! so concurrent invocations never share the tool's session state.

mod error;
pub use error::{ErrorClass, ExecError, ExecResult};

mod pool;
pub use pool::{Slot, SlotPool};

mod runner;
pub use runner::{CliConfig, CliRunner, CommandRunner};

mod util;
