#![forbid(unsafe_code)]

//! Facade over the tabula workspace. Everything a walkthrough needs is
//! re-exported from one place: building frames, merging, reshaping,
//! cleaning, round-tripping CSV, and pulling JSON feeds.

pub use tb_columnar::{Column, ColumnError, compare_scalars};
pub use tb_fetch::{
    ApiCredentials, FeedWindow, FetchError, FixtureTransport, GeocodeClient, HttpTransport,
    JsonLineStream, QuakeFeedClient, SocialFeedClient, Transport,
};
pub use tb_frame::{DataFrame, FrameError, Series, concat_columns, concat_rows};
pub use tb_index::{
    AlignPolicy, AlignmentPlan, IndexError, Label, RowIndex, align, align_intersection,
    align_union,
};
pub use tb_io::{
    IoError, frame_from_json_str, frame_from_records, read_csv_path, read_csv_str, write_csv_path,
    write_csv_string,
};
pub use tb_join::{JoinError, JoinHow, KeySelect, MergeSpec, merge};
pub use tb_reshape::{
    CutOptions, ReshapeError, StackOptions, StackedSeries, cut, get_dummies, stack, unstack,
};
pub use tb_types::{DType, Scalar, TypeError};
