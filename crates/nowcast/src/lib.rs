mod domains;
mod pipeline;
mod utils;

pub use domains::*;
pub use pipeline::*;
pub use utils::*;
