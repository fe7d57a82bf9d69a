pub mod aggregating;
pub mod capture;
pub mod executing;
pub mod testing;
