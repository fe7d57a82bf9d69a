pub mod config;
pub mod constants;
pub mod core;
pub mod mappers;
pub mod python;
