//! CLI commands

mod init;
mod list;
mod run;

pub use init::InitCommand;
pub use list::ListCommand;
pub use run::RunCommand;
