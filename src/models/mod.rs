pub mod job;
pub mod response;

pub use job::*;
pub use response::*;
