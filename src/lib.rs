//! kvs_audio - call audio extraction from pre-parsed container streams.
//!
//! Elements flow from an [`mkv::ElementSource`] through
//! [`extract::next_matching_frame`], which filters them by contact and track,
//! into a [`chunk::ChunkAggregator`] that assembles frame-counted chunks.
//! [`session`] opens the underlying media stream and [`net_link`] hands the
//! chunks to the speech pipeline.

pub mod chunk;
pub mod config;
pub mod error;
pub mod extract;
pub mod fragment;
pub mod mkv;
pub mod net_link;
pub mod session;
pub mod track;

pub use chunk::{Chunk, ChunkAggregator, ChunkEnd};
pub use error::{ExtractError, SessionError, UnknownTrack};
pub use extract::{Outcome, next_matching_frame};
pub use fragment::{FragmentMetadata, TagState, TrackResolver};
pub use mkv::{Element, ElementSource, Frame};
pub use session::{MediaService, StartSelector, StreamSession};
pub use track::TrackName;
