mod paths;
mod records;

pub use paths::*;
pub use records::*;
