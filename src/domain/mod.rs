pub mod household;
pub mod records;

pub use household::*;
pub use records::*;
