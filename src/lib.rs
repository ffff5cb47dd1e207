pub mod args;
pub mod builtin;
pub mod command;
pub mod completion;
pub mod exec;
pub mod history;
pub mod parser;
pub mod process;
pub mod redirect;
pub mod repl;
pub mod terminal;
