pub mod constants;
pub mod gateway;
pub mod halt;
pub mod journal;
pub mod scheduler;
pub mod state;
pub mod strategy;
pub mod types;
pub mod utils;

#[cfg(test)]
mod testing;
