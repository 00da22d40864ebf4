//! Line-oriented JSON input for driving the reactor from a pipe or terminal.

mod input;

pub use input::{InputMessage, forward_lines, parse_line};
