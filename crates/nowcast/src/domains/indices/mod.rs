mod apparent_temperature;
mod umbrella;

pub use apparent_temperature::*;
pub use umbrella::*;
