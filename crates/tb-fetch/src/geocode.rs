use serde_json::Value;
use tb_columnar::Column;
use tb_frame::DataFrame;
use tb_types::Scalar;
use tracing::debug;

use crate::FetchError;
use crate::transport::Transport;

pub const GEOCODE_ENDPOINT: &str =
    "https://geocode.arcgis.com/arcgis/rest/services/World/GeocodeServer/findAddressCandidates";

/// Client for the parameter-query geocoding endpoint: free text in, one row
/// per address candidate out.
#[derive(Debug, Clone)]
pub struct GeocodeClient<T: Transport> {
    transport: T,
    endpoint: String,
}

impl<T: Transport> GeocodeClient<T> {
    #[must_use]
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            endpoint: GEOCODE_ENDPOINT.to_owned(),
        }
    }

    #[must_use]
    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.to_owned();
        self
    }

    pub fn geocode(&self, text: &str, max_results: usize) -> Result<DataFrame, FetchError> {
        let query = vec![
            ("f".to_owned(), "json".to_owned()),
            ("text".to_owned(), text.to_owned()),
            ("maxLocations".to_owned(), max_results.to_string()),
        ];
        let body = self.transport.get(&self.endpoint, &query, &[])?;
        let document: Value = serde_json::from_str(&body)?;

        let candidates = document
            .get("candidates")
            .and_then(Value::as_array)
            .ok_or(FetchError::MalformedDocument {
                context: "candidates",
            })?;
        debug!(text, candidates = candidates.len(), "parsed geocode response");

        let mut labels = Vec::with_capacity(candidates.len());
        let mut longitudes = Vec::with_capacity(candidates.len());
        let mut latitudes = Vec::with_capacity(candidates.len());
        let mut scores = Vec::with_capacity(candidates.len());

        for candidate in candidates {
            labels.push(
                candidate
                    .get("address")
                    .and_then(Value::as_str)
                    .map_or(Scalar::Null, Scalar::from),
            );
            let axis = |name: &str| {
                candidate
                    .get("location")
                    .and_then(|location| location.get(name))
                    .and_then(Value::as_f64)
                    .map_or(Scalar::Null, Scalar::Float64)
            };
            longitudes.push(axis("x"));
            latitudes.push(axis("y"));
            scores.push(
                candidate
                    .get("score")
                    .and_then(Value::as_f64)
                    .map_or(Scalar::Null, Scalar::Float64),
            );
        }

        Ok(DataFrame::from_columns(vec![
            ("label".to_owned(), Column::from_values(labels)?),
            ("longitude".to_owned(), Column::from_values(longitudes)?),
            ("latitude".to_owned(), Column::from_values(latitudes)?),
            ("score".to_owned(), Column::from_values(scores)?),
        ])?)
    }
}
