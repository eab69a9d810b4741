use serde_json::Value;
use tb_columnar::Column;
use tb_frame::DataFrame;
use tb_types::Scalar;
use tracing::debug;

use crate::FetchError;
use crate::credentials::ApiCredentials;
use crate::stream::JsonLineStream;
use crate::transport::Transport;

pub const TIMELINE_ENDPOINT: &str = "https://api.twitter.com/1.1/statuses/user_timeline.json";
pub const SAMPLE_STREAM_ENDPOINT: &str = "https://stream.twitter.com/1.1/statuses/sample.json";

/// Client for the authenticated social feed. Every request carries the
/// bearer header derived from out-of-band credential material.
pub struct SocialFeedClient<T: Transport> {
    transport: T,
    credentials: ApiCredentials,
    timeline_endpoint: String,
    stream_endpoint: String,
}

impl<T: Transport> SocialFeedClient<T> {
    #[must_use]
    pub fn new(transport: T, credentials: ApiCredentials) -> Self {
        Self {
            transport,
            credentials,
            timeline_endpoint: TIMELINE_ENDPOINT.to_owned(),
            stream_endpoint: SAMPLE_STREAM_ENDPOINT.to_owned(),
        }
    }

    #[must_use]
    pub fn with_endpoints(mut self, timeline: &str, stream: &str) -> Self {
        self.timeline_endpoint = timeline.to_owned();
        self.stream_endpoint = stream.to_owned();
        self
    }

    /// Recent posts for one account, one row per post.
    pub fn user_timeline(&self, screen_name: &str, count: usize) -> Result<DataFrame, FetchError> {
        let query = vec![
            ("screen_name".to_owned(), screen_name.to_owned()),
            ("count".to_owned(), count.to_string()),
        ];
        let headers = vec![self.credentials.authorization_header()];
        let body = self.transport.get(&self.timeline_endpoint, &query, &headers)?;

        let document: Value = serde_json::from_str(&body)?;
        let posts = document
            .as_array()
            .ok_or(FetchError::MalformedDocument { context: "posts" })?;
        debug!(screen_name, posts = posts.len(), "parsed timeline response");

        let mut ids = Vec::with_capacity(posts.len());
        let mut created = Vec::with_capacity(posts.len());
        let mut texts = Vec::with_capacity(posts.len());
        let mut retweets = Vec::with_capacity(posts.len());
        let mut favorites = Vec::with_capacity(posts.len());

        for post in posts {
            let int = |name: &str| {
                post.get(name)
                    .and_then(Value::as_i64)
                    .map_or(Scalar::Null, Scalar::Int64)
            };
            let text = |name: &str| {
                post.get(name)
                    .and_then(Value::as_str)
                    .map_or(Scalar::Null, Scalar::from)
            };

            ids.push(int("id"));
            created.push(text("created_at"));
            texts.push(text("text"));
            retweets.push(int("retweet_count"));
            favorites.push(int("favorite_count"));
        }

        Ok(DataFrame::from_columns(vec![
            ("id".to_owned(), Column::from_values(ids)?),
            ("created_at".to_owned(), Column::from_values(created)?),
            ("text".to_owned(), Column::from_values(texts)?),
            ("retweets".to_owned(), Column::from_values(retweets)?),
            ("favorites".to_owned(), Column::from_values(favorites)?),
        ])?)
    }

    /// Long-lived sample stream as a blocking document iterator.
    pub fn sample_stream(&self) -> Result<JsonLineStream<Box<dyn std::io::Read + Send>>, FetchError> {
        let headers = vec![self.credentials.authorization_header()];
        let reader = self
            .transport
            .open_stream(&self.stream_endpoint, &[], &headers)?;
        Ok(JsonLineStream::new(reader))
    }
}
