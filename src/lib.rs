pub mod cli;
pub mod config;
pub mod domain;
pub mod paths;
pub mod portal;
pub mod services;
pub mod sync;

#[cfg(test)]
pub mod testing;
