mod interpolate;
mod kernels;
mod merge;
mod timed_value;

pub use interpolate::*;
pub use kernels::*;
pub use merge::*;
pub use timed_value::*;
