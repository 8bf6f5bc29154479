mod download_forecast;
mod weather_category;

pub use download_forecast::*;
pub use weather_category::*;
