pub mod domain;
pub mod errors;
pub mod executor;
pub mod lifecycle;
pub mod literal;
pub mod pipeline;
pub mod traits;
pub mod worker;
