mod forecasts;
mod indices;
mod observations;
mod series;

pub use forecasts::*;
pub use indices::*;
pub use observations::*;
pub use series::*;
