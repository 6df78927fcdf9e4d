mod config;
mod relabel;
mod string_replacer;


pub use config::*;
pub use relabel::*;
