//! Report output.

mod generator;

pub use generator::{summary_lines, write_json_report, write_markdown_report};
