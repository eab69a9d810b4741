use chrono::{TimeZone, Utc};
use serde_json::Value;
use tb_columnar::Column;
use tb_frame::DataFrame;
use tb_types::Scalar;
use tracing::debug;

use crate::FetchError;
use crate::transport::Transport;

pub const QUAKE_FEED_BASE: &str = "https://earthquake.usgs.gov/earthquakes/feed/v1.0/summary";

/// Which rolling summary window of the feed to pull.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedWindow {
    PastHour,
    PastDay,
    PastWeek,
    PastMonth,
}

impl FeedWindow {
    #[must_use]
    pub fn segment(self) -> &'static str {
        match self {
            Self::PastHour => "all_hour.geojson",
            Self::PastDay => "all_day.geojson",
            Self::PastWeek => "all_week.geojson",
            Self::PastMonth => "all_month.geojson",
        }
    }
}

/// Client for the public earthquake GeoJSON feed: one GET, no auth, one row
/// per event.
#[derive(Debug, Clone)]
pub struct QuakeFeedClient<T: Transport> {
    transport: T,
    base_url: String,
}

impl<T: Transport> QuakeFeedClient<T> {
    #[must_use]
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            base_url: QUAKE_FEED_BASE.to_owned(),
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_owned();
        self
    }

    pub fn fetch(&self, window: FeedWindow) -> Result<DataFrame, FetchError> {
        let url = format!("{}/{}", self.base_url, window.segment());
        let body = self.transport.get(&url, &[], &[])?;
        let document: Value = serde_json::from_str(&body)?;

        let features = document
            .get("features")
            .and_then(Value::as_array)
            .ok_or(FetchError::MalformedDocument {
                context: "features",
            })?;
        debug!(events = features.len(), "parsed earthquake feed");

        let mut ids = Vec::with_capacity(features.len());
        let mut magnitudes = Vec::with_capacity(features.len());
        let mut places = Vec::with_capacity(features.len());
        let mut times = Vec::with_capacity(features.len());
        let mut tsunami_flags = Vec::with_capacity(features.len());
        let mut longitudes = Vec::with_capacity(features.len());
        let mut latitudes = Vec::with_capacity(features.len());
        let mut depths = Vec::with_capacity(features.len());

        for feature in features {
            let properties = feature.get("properties").ok_or(FetchError::MalformedDocument {
                context: "properties",
            })?;

            ids.push(json_utf8(feature.get("id")));
            magnitudes.push(json_float(properties.get("mag")));
            places.push(json_utf8(properties.get("place")));
            times.push(epoch_millis_to_rfc3339(properties.get("time")));
            tsunami_flags.push(json_int(properties.get("tsunami")));

            let coordinates = feature
                .get("geometry")
                .and_then(|geometry| geometry.get("coordinates"))
                .and_then(Value::as_array);
            let coordinate = |idx: usize| {
                coordinates
                    .and_then(|coords| coords.get(idx))
                    .map_or(Scalar::Null, |value| json_float(Some(value)))
            };
            longitudes.push(coordinate(0));
            latitudes.push(coordinate(1));
            depths.push(coordinate(2));
        }

        Ok(DataFrame::from_columns(vec![
            ("id".to_owned(), Column::from_values(ids)?),
            ("magnitude".to_owned(), Column::from_values(magnitudes)?),
            ("place".to_owned(), Column::from_values(places)?),
            ("time".to_owned(), Column::from_values(times)?),
            ("tsunami".to_owned(), Column::from_values(tsunami_flags)?),
            ("longitude".to_owned(), Column::from_values(longitudes)?),
            ("latitude".to_owned(), Column::from_values(latitudes)?),
            ("depth".to_owned(), Column::from_values(depths)?),
        ])?)
    }
}

fn json_utf8(value: Option<&Value>) -> Scalar {
    value
        .and_then(Value::as_str)
        .map_or(Scalar::Null, Scalar::from)
}

fn json_float(value: Option<&Value>) -> Scalar {
    value
        .and_then(Value::as_f64)
        .map_or(Scalar::Null, Scalar::Float64)
}

fn json_int(value: Option<&Value>) -> Scalar {
    value
        .and_then(Value::as_i64)
        .map_or(Scalar::Null, Scalar::Int64)
}

fn epoch_millis_to_rfc3339(value: Option<&Value>) -> Scalar {
    value
        .and_then(Value::as_i64)
        .and_then(|millis| Utc.timestamp_millis_opt(millis).single())
        .map_or(Scalar::Null, |stamp| Scalar::Utf8(stamp.to_rfc3339()))
}

#[cfg(test)]
mod tests {
    use tb_types::Scalar;

    use super::{FeedWindow, QuakeFeedClient};
    use crate::FetchError;
    use crate::transport::FixtureTransport;

    const FEED_BODY: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "id": "us7000abcd",
                "properties": {
                    "mag": 4.7,
                    "place": "42 km SSW of Somewhere",
                    "time": 1262311380000,
                    "tsunami": 0
                },
                "geometry": {"coordinates": [-117.6, 35.8, 10.2]}
            },
            {
                "id": "us7000wxyz",
                "properties": {
                    "mag": null,
                    "place": "Elsewhere",
                    "time": 1262311440000,
                    "tsunami": 1
                },
                "geometry": {"coordinates": [140.1, -5.2, 33.0]}
            }
        ]
    }"#;

    #[test]
    fn feed_rows_flatten_into_one_row_per_event() {
        let transport = FixtureTransport::new();
        transport
            .register(
                "https://quake.test/feed/all_day.geojson",
                FEED_BODY,
            )
            .expect("register");

        let client = QuakeFeedClient::new(transport).with_base_url("https://quake.test/feed");
        let frame = client.fetch(FeedWindow::PastDay).expect("fetch");

        assert_eq!(frame.len(), 2);
        assert_eq!(
            frame.column_names(),
            vec![
                "id",
                "magnitude",
                "place",
                "time",
                "tsunami",
                "longitude",
                "latitude",
                "depth"
            ]
        );
        assert_eq!(
            frame.column("magnitude").expect("magnitude").values(),
            &[Scalar::Float64(4.7), Scalar::Null]
        );
        assert_eq!(
            frame.column("tsunami").expect("tsunami").values(),
            &[Scalar::Int64(0), Scalar::Int64(1)]
        );
        assert_eq!(
            frame.column("time").expect("time").values()[0],
            Scalar::from("2010-01-01T02:03:00+00:00")
        );
        assert_eq!(
            frame.column("longitude").expect("longitude").values(),
            &[Scalar::Float64(-117.6), Scalar::Float64(140.1)]
        );
    }

    #[test]
    fn feeds_without_features_are_malformed() {
        let transport = FixtureTransport::new();
        transport
            .register("https://quake.test/feed/all_hour.geojson", "{}")
            .expect("register");

        let client = QuakeFeedClient::new(transport).with_base_url("https://quake.test/feed");
        let err = client.fetch(FeedWindow::PastHour).expect_err("must fail");
        assert!(matches!(
            err,
            FetchError::MalformedDocument { context: "features" }
        ));
    }
}
