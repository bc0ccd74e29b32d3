//! Frame extraction: pull elements until one frame for the requested contact
//! and track turns up, or something ends the search.

use bytes::Bytes;

use crate::error::ExtractError;
use crate::fragment::{TagState, TrackResolver};
use crate::mkv::{CONTACT_ID_TAG, Element, ElementSource, STOP_STREAMING_TAG};
use crate::track::track_matches;

/// Result of one extraction call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Payload of a frame on the requested track.
    Frame(Bytes),
    /// The fragment belongs to another contact.
    SessionMismatch,
    /// The producer tagged the fragment with `STOP_STREAMING=true`.
    Stopped,
    /// The source will not produce any more elements.
    Exhausted,
}

impl Outcome {
    /// Collapse to the byte buffer form: every non-frame outcome is empty.
    pub fn into_bytes(self) -> Bytes {
        match self {
            Outcome::Frame(data) => data,
            Outcome::SessionMismatch | Outcome::Stopped | Outcome::Exhausted => Bytes::new(),
        }
    }

    pub fn is_frame(&self) -> bool {
        matches!(self, Outcome::Frame(_))
    }
}

/// Pull elements from `source` until a frame of `track` for `contact_id` is
/// found.
///
/// Every element is shown to `metadata` before it is inspected. A frame in a
/// fragment tagged with another contact's `ContactId`, or a boundary closing
/// such a fragment, ends the call with [`Outcome::SessionMismatch`]; a visible
/// stop tag ends it with [`Outcome::Stopped`] at the next frame. Polls that yield nothing are retried
/// for as long as the source might still produce elements.
pub fn next_matching_frame<S, M>(
    source: &mut S,
    metadata: &mut M,
    contact_id: &str,
    track: &str,
) -> Result<Outcome, ExtractError>
where
    S: ElementSource + ?Sized,
    M: TagState + TrackResolver + ?Sized,
{
    while source.might_have_next() {
        let Some(element) = source.next_if_available()? else {
            std::thread::yield_now();
            continue;
        };

        metadata.observe(&element);

        match element {
            Element::FragmentStart { .. } => {
                if let Some(tagged) =
                    foreign_contact(metadata.closed_tag(CONTACT_ID_TAG), contact_id)
                {
                    log::info!(
                        "Fragment belonged to contact {}, expected {}",
                        tagged,
                        contact_id
                    );
                    return Ok(Outcome::SessionMismatch);
                }
            }
            Element::Frame(frame) => {
                if metadata.tag(STOP_STREAMING_TAG) == Some("true") {
                    log::info!("STOP_STREAMING received for contact {}", contact_id);
                    return Ok(Outcome::Stopped);
                }
                if let Some(tagged) = foreign_contact(metadata.tag(CONTACT_ID_TAG), contact_id) {
                    log::debug!("Dropping frame of contact {}, expected {}", tagged, contact_id);
                    return Ok(Outcome::SessionMismatch);
                }

                match metadata.track_name(frame.track_number) {
                    Some(resolved) if track_matches(track, resolved) => {
                        return Ok(Outcome::Frame(frame.data));
                    }
                    Some(_) => {}
                    None => log::debug!(
                        "Dropping frame on track {} without track metadata",
                        frame.track_number
                    ),
                }
            }
            Element::Tag(_) | Element::Track(_) => {}
        }
    }

    Ok(Outcome::Exhausted)
}

fn foreign_contact<'a>(tagged: Option<&'a str>, contact_id: &str) -> Option<&'a str> {
    tagged.filter(|tagged| *tagged != contact_id)
}
