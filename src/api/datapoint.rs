//! Time Series Data
//!
//! Data points returned by the history endpoints and the resolutions they
//! can be queried at.

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// The granularity of a history query.
///
/// `Raw` data points carry only a value; the aggregated resolutions also
/// provide the min and max observed within each window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Raw,
    /// 30 minute windows, available for ranges up to seven days.
    SevenDays,
    /// 60 minute windows, available for ranges up to thirty days.
    ThirtyDays,
    /// Daily windows, available for ranges up to six months.
    SixMonths,
}

impl Resolution {
    /// The value the API expects in the `resolution` query parameter.
    pub fn as_param(&self) -> &'static str {
        match self {
            Resolution::Raw => "raw",
            Resolution::SevenDays => "30",
            Resolution::ThirtyDays => "60",
            Resolution::SixMonths => "1440",
        }
    }
}

/// A single data point of a time series.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DataPoint {
    /// The data point's timestamp.
    pub timestamp: DateTime<Utc>,

    /// The value of the data point.
    pub value: i64,

    /// The minimum within the window, for aggregated resolutions.
    #[serde(default)]
    pub min: Option<i64>,

    /// The maximum within the window, for aggregated resolutions.
    #[serde(default)]
    pub max: Option<i64>,

    /// Index of the metric group when several were requested.
    #[serde(default)]
    pub group: Option<i64>,

    /// Name of the metric when more than one was requested.
    #[serde(default)]
    pub name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_data_point() {
        let json = r#"{"timestamp": "2021-07-01T10:00:00.000Z", "value": 42}"#;
        let point: DataPoint = serde_json::from_str(json).unwrap();
        assert_eq!(point.value, 42);
        assert_eq!(point.min, None);
        assert_eq!(point.max, None);
        assert_eq!(point.timestamp.to_rfc3339(), "2021-07-01T10:00:00+00:00");
    }

    #[test]
    fn test_aggregated_data_point() {
        let json = r#"{
            "timestamp": "2021-07-01T10:00:00.000Z",
            "value": 40, "min": 35, "max": 48
        }"#;
        let point: DataPoint = serde_json::from_str(json).unwrap();
        assert_eq!((point.min, point.max), (Some(35), Some(48)));
    }

    #[test]
    fn test_resolution_params() {
        assert_eq!(Resolution::Raw.as_param(), "raw");
        assert_eq!(Resolution::SevenDays.as_param(), "30");
        assert_eq!(Resolution::ThirtyDays.as_param(), "60");
        assert_eq!(Resolution::SixMonths.as_param(), "1440");
    }
}
