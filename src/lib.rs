// Core infrastructure modules
pub mod core;
pub mod drivers;

// Client modules
pub mod config;
pub mod dsn;
pub mod env;
pub mod handler;
pub mod input;
pub mod repl;
pub mod statement;
pub mod terminal;

#[cfg(test)]
pub mod test_utils;
