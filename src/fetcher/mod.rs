//! Media fetching
//!
//! The [`Fetcher`] trait is the seam between the job runner and whatever
//! actually pulls media off the network. Two implementations ship:
//!
//! - [`YtDlpFetcher`]: drives the external `yt-dlp` binary
//! - [`UnavailableFetcher`]: stub used when no binary can be found
//!
//! Fetchers report byte-level progress through a [`ProgressSink`] and stop
//! early when their [`CancellationToken`](tokio_util::sync::CancellationToken)
//! fires.

mod parser;
mod traits;
mod unavailable;
mod ytdlp;

pub use traits::{
    FetchOutcome, FetchRequest, Fetcher, MediaFormat, MediaInfo, ProgressEvent, ProgressSink,
};
pub use unavailable::UnavailableFetcher;
pub use ytdlp::YtDlpFetcher;
