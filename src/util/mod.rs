//! Shared utilities

pub mod config;
pub mod context;
pub mod diagnostic;
pub mod fs;
pub mod hash;
pub mod interrupt;
pub mod process;
pub mod shell;

pub use config::Config;
pub use context::{GlobalContext, Paths};
pub use diagnostic::Diagnostic;
pub use interrupt::CancelToken;
pub use shell::{Shell, Status};
