mod collect_window;
mod download_observations;

pub use download_observations::*;
