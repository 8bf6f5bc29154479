use serde::Serialize;

/// Coarse grouping of the provider's three-digit weather codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WeatherCategory {
    Sunny,
    Cloudy,
    Rain,
    Snow,
    Unknown,
}

impl WeatherCategory {
    /// The leading digit decides: 1xx sunny, 2xx cloudy, 3xx rain, 4xx snow
    pub fn from_code(code: &str) -> Self {
        let code = code.trim();
        if code.len() != 3 || !code.bytes().all(|b| b.is_ascii_digit()) {
            return WeatherCategory::Unknown;
        }
        match code.as_bytes()[0] {
            b'1' => WeatherCategory::Sunny,
            b'2' => WeatherCategory::Cloudy,
            b'3' => WeatherCategory::Rain,
            b'4' => WeatherCategory::Snow,
            _ => WeatherCategory::Unknown,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            WeatherCategory::Sunny => "sunny",
            WeatherCategory::Cloudy => "cloudy",
            WeatherCategory::Rain => "rain",
            WeatherCategory::Snow => "snow",
            WeatherCategory::Unknown => "unknown",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            WeatherCategory::Sunny => "☀️",
            WeatherCategory::Cloudy => "☁️",
            WeatherCategory::Rain => "☔",
            WeatherCategory::Snow => "⛄",
            WeatherCategory::Unknown => "❓",
        }
    }
}
