//! Chunk aggregation over repeated frame extraction.
//!
//! Chunk size is counted in frames, not bytes: a chunk of four units is four
//! matched non-empty frames, whatever their payload sizes.

use std::num::NonZeroUsize;

use bytes::{Bytes, BytesMut};

use crate::error::ExtractError;
use crate::extract::{Outcome, next_matching_frame};
use crate::fragment::{FragmentMetadata, TagState, TrackResolver};
use crate::mkv::ElementSource;

/// Why a call to [`ChunkAggregator::collect_chunk`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkEnd {
    /// The requested number of units was collected.
    Complete,
    /// The source ran dry first.
    Exhausted,
    /// The configured extraction-call cap was reached first.
    AttemptLimit,
}

/// Concatenated payload of the frames collected for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub data: Bytes,
    pub units: usize,
    pub end: ChunkEnd,
}

impl Chunk {
    fn empty(end: ChunkEnd) -> Self {
        Self {
            data: Bytes::new(),
            units: 0,
            end,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Drives [`next_matching_frame`] over one media session.
///
/// The aggregator owns the element source and the fragment metadata, so tag
/// state carries over from one chunk to the next.
///
/// Without an attempt cap, a live stream that never carries the requested
/// track keeps `collect` looping for as long as the source stays open.
pub struct ChunkAggregator<S, M = FragmentMetadata> {
    source: S,
    metadata: M,
    max_attempts: Option<NonZeroUsize>,
    exhausted: bool,
}

impl<S: ElementSource> ChunkAggregator<S, FragmentMetadata> {
    pub fn new(source: S) -> Self {
        Self::with_metadata(source, FragmentMetadata::new())
    }
}

impl<S, M> ChunkAggregator<S, M>
where
    S: ElementSource,
    M: TagState + TrackResolver,
{
    pub fn with_metadata(source: S, metadata: M) -> Self {
        Self {
            source,
            metadata,
            max_attempts: None,
            exhausted: false,
        }
    }

    /// Bound the number of extraction calls spent on a single chunk.
    pub fn with_max_attempts(mut self, max_attempts: Option<NonZeroUsize>) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn metadata(&self) -> &M {
        &self.metadata
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// True once the source reported it will produce nothing more.
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Collect `units` frames of `track` for `contact_id` and concatenate them.
    pub fn collect(
        &mut self,
        contact_id: &str,
        units: usize,
        track: &str,
    ) -> Result<Bytes, ExtractError> {
        self.collect_chunk(contact_id, units, track)
            .map(|chunk| chunk.data)
    }

    /// Like [`collect`](Self::collect), also reporting how many units were
    /// gathered and why collection ended.
    pub fn collect_chunk(
        &mut self,
        contact_id: &str,
        units: usize,
        track: &str,
    ) -> Result<Chunk, ExtractError> {
        if units == 0 {
            return Ok(Chunk::empty(ChunkEnd::Complete));
        }

        let mut frames: Vec<Bytes> = Vec::with_capacity(units);
        let mut attempts = 0usize;
        let end = loop {
            if frames.len() == units {
                break ChunkEnd::Complete;
            }
            if self.exhausted {
                break ChunkEnd::Exhausted;
            }
            if let Some(limit) = self.max_attempts {
                if attempts >= limit.get() {
                    log::warn!(
                        "Gave up on chunk after {} extraction calls ({}/{} units)",
                        attempts,
                        frames.len(),
                        units
                    );
                    break ChunkEnd::AttemptLimit;
                }
            }
            attempts += 1;

            match next_matching_frame(&mut self.source, &mut self.metadata, contact_id, track)? {
                Outcome::Frame(data) if !data.is_empty() => frames.push(data),
                Outcome::Frame(_) | Outcome::SessionMismatch | Outcome::Stopped => {}
                Outcome::Exhausted => {
                    log::info!("Media stream exhausted for contact {}", contact_id);
                    self.exhausted = true;
                }
            }
        };

        let collected = frames.len();
        let total: usize = frames.iter().map(Bytes::len).sum();
        if total == 0 {
            return Ok(Chunk::empty(end));
        }

        let mut data = BytesMut::with_capacity(total);
        for frame in &frames {
            data.extend_from_slice(frame);
        }
        log::debug!("Chunk of {} units, {} bytes ({:?})", collected, total, end);

        Ok(Chunk {
            data: data.freeze(),
            units: collected,
            end,
        })
    }
}
