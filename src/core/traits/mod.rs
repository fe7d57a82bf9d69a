pub mod interpreter;
pub mod runner;
