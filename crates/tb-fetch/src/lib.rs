#![forbid(unsafe_code)]

pub mod credentials;
pub mod geocode;
pub mod quake;
pub mod social;
pub mod stream;
pub mod transport;

use thiserror::Error;

pub use credentials::ApiCredentials;
pub use geocode::GeocodeClient;
pub use quake::{FeedWindow, QuakeFeedClient};
pub use social::SocialFeedClient;
pub use stream::JsonLineStream;
pub use transport::{FixtureTransport, HttpTransport, Transport};

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed with status {status}")]
    Status { url: String, status: u16 },
    #[error("response is missing expected field {context:?}")]
    MalformedDocument { context: &'static str },
    #[error("no fixture body registered for {0}")]
    FixtureMissing(String),
    #[error("fixture transport lock poisoned")]
    FixtureLockPoisoned,
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Column(#[from] tb_columnar::ColumnError),
    #[error(transparent)]
    Frame(#[from] tb_frame::FrameError),
}
