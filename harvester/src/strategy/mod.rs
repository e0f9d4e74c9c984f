pub mod data;
pub mod executable;
pub mod monitor;
pub mod policy;
pub mod settings;
