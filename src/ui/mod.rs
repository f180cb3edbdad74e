pub mod terminal;

pub use terminal::{Command, OutputFormat, StatusLine, apply, parse_command, run};
