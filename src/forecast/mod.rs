pub mod fanout;
pub mod trend;

pub use fanout::*;
pub use trend::*;
