use bytes::Bytes;
use rstest::{fixture, rstest};

use kvs_audio::fragment::FragmentMetadata;
use kvs_audio::mkv::{CONTACT_ID_TAG, Element, MemorySource, STOP_STREAMING_TAG};
use kvs_audio::{Outcome, next_matching_frame};

const CONTACT: &str = "7b3e2a90-5c1d-4f6e-9a8b-0c1d2e3f4a5b";
const FROM_CUSTOMER: &str = "AUDIO_FROM_CUSTOMER";
const TO_CUSTOMER: &str = "AUDIO_TO_CUSTOMER";

#[fixture]
fn tracks() -> Vec<Element> {
    vec![
        Element::track(1, TO_CUSTOMER),
        Element::track(2, FROM_CUSTOMER),
    ]
}

fn drain(source: &mut MemorySource, metadata: &mut FragmentMetadata, track: &str) -> Vec<Outcome> {
    let mut outcomes = Vec::new();
    loop {
        let outcome = next_matching_frame(source, metadata, CONTACT, track).unwrap();
        let done = outcome == Outcome::Exhausted;
        outcomes.push(outcome);
        if done {
            return outcomes;
        }
    }
}

fn frame(bytes: &'static [u8]) -> Outcome {
    Outcome::Frame(Bytes::from_static(bytes))
}

#[rstest]
fn matching_frames_arrive_in_order_until_exhaustion(tracks: Vec<Element>) {
    let mut elements = vec![Element::fragment_start()];
    elements.extend(tracks);
    elements.extend([
        Element::tag(CONTACT_ID_TAG, CONTACT),
        Element::frame(2, vec![1u8]),
        Element::frame(1, vec![100u8]),
        Element::frame(2, vec![2u8]),
        Element::fragment_start(),
        Element::tag(CONTACT_ID_TAG, CONTACT),
        Element::frame(2, vec![3u8]),
    ]);
    let mut source = MemorySource::new(elements);
    let mut metadata = FragmentMetadata::new();

    let outcomes = drain(&mut source, &mut metadata, FROM_CUSTOMER);
    assert_eq!(
        outcomes,
        vec![frame(&[1]), frame(&[2]), frame(&[3]), Outcome::Exhausted]
    );
}

#[rstest]
fn missing_contact_tag_does_not_filter(tracks: Vec<Element>) {
    let mut elements = tracks;
    elements.extend([Element::fragment_start(), Element::frame(1, vec![5u8])]);
    let mut source = MemorySource::new(elements);
    let mut metadata = FragmentMetadata::new();

    let outcome = next_matching_frame(&mut source, &mut metadata, CONTACT, TO_CUSTOMER).unwrap();
    assert_eq!(outcome, frame(&[5]));
}

#[rstest]
fn stop_tag_preempts_later_matching_frames(tracks: Vec<Element>) {
    let mut elements = vec![Element::fragment_start()];
    elements.extend(tracks);
    elements.extend([
        Element::tag(CONTACT_ID_TAG, CONTACT),
        Element::frame(2, vec![1u8]),
        Element::tag(STOP_STREAMING_TAG, "true"),
        Element::frame(2, vec![2u8]),
        Element::frame(2, vec![3u8]),
    ]);
    let mut source = MemorySource::new(elements);
    let mut metadata = FragmentMetadata::new();

    assert_eq!(
        next_matching_frame(&mut source, &mut metadata, CONTACT, FROM_CUSTOMER).unwrap(),
        frame(&[1])
    );
    assert_eq!(
        next_matching_frame(&mut source, &mut metadata, CONTACT, FROM_CUSTOMER).unwrap(),
        Outcome::Stopped
    );
    // The stop tag stays in force for the rest of the fragment.
    assert_eq!(
        next_matching_frame(&mut source, &mut metadata, CONTACT, FROM_CUSTOMER).unwrap(),
        Outcome::Stopped
    );
}

#[rstest]
#[case("true", true)]
#[case("false", false)]
#[case("TRUE", false)]
fn only_literal_true_stops(tracks: Vec<Element>, #[case] value: &str, #[case] stops: bool) {
    let mut elements = tracks;
    elements.extend([
        Element::fragment_start(),
        Element::tag(STOP_STREAMING_TAG, value),
        Element::frame(2, vec![7u8]),
    ]);
    let mut source = MemorySource::new(elements);
    let mut metadata = FragmentMetadata::new();

    let outcome = next_matching_frame(&mut source, &mut metadata, CONTACT, FROM_CUSTOMER).unwrap();
    assert_eq!(outcome == Outcome::Stopped, stops);
}

#[rstest]
fn contact_mismatch_at_boundary_stops_reading(tracks: Vec<Element>) {
    let mut elements = tracks;
    elements.extend([
        Element::fragment_start(),
        Element::tag(CONTACT_ID_TAG, "another-contact"),
        Element::fragment_start(),
        Element::frame(2, vec![1u8]),
        Element::frame(2, vec![2u8]),
    ]);
    let mut source = MemorySource::new(elements);
    let mut metadata = FragmentMetadata::new();

    let outcome = next_matching_frame(&mut source, &mut metadata, CONTACT, FROM_CUSTOMER).unwrap();
    assert_eq!(outcome, Outcome::SessionMismatch);
    assert_eq!(source.remaining(), 2);
}

#[rstest]
fn frames_of_a_foreign_contact_fragment_are_not_returned(tracks: Vec<Element>) {
    let mut elements = vec![Element::fragment_start()];
    elements.extend(tracks);
    elements.extend([
        Element::tag(CONTACT_ID_TAG, CONTACT),
        Element::frame(2, vec![0x01u8]),
        Element::fragment_start(),
        Element::tag(CONTACT_ID_TAG, "another-contact"),
        Element::frame(2, vec![0xbbu8]),
        Element::fragment_start(),
        Element::tag(CONTACT_ID_TAG, CONTACT),
        Element::frame(2, vec![0x02u8]),
    ]);
    let mut source = MemorySource::new(elements);
    let mut metadata = FragmentMetadata::new();

    let outcomes = drain(&mut source, &mut metadata, FROM_CUSTOMER);
    assert_eq!(
        outcomes,
        vec![
            frame(&[0x01]),
            Outcome::SessionMismatch,
            Outcome::SessionMismatch,
            frame(&[0x02]),
            Outcome::Exhausted,
        ]
    );
}

#[rstest]
fn stop_tag_does_not_outlive_its_fragment(tracks: Vec<Element>) {
    let mut elements = vec![Element::fragment_start()];
    elements.extend(tracks);
    elements.extend([
        Element::tag(STOP_STREAMING_TAG, "true"),
        Element::frame(2, vec![1u8]),
        Element::fragment_start(),
        Element::frame(2, vec![7u8]),
    ]);
    let mut source = MemorySource::new(elements);
    let mut metadata = FragmentMetadata::new();

    let outcomes = drain(&mut source, &mut metadata, FROM_CUSTOMER);
    assert_eq!(outcomes, vec![Outcome::Stopped, frame(&[7]), Outcome::Exhausted]);
}

#[rstest]
#[case(FROM_CUSTOMER, true)]
#[case(TO_CUSTOMER, false)]
fn legacy_track_only_matches_customer_audio(#[case] requested: &str, #[case] matches: bool) {
    let mut source = MemorySource::new([
        Element::track(1, "Track_audio/L16"),
        Element::fragment_start(),
        Element::frame(1, vec![0x2au8]),
    ]);
    let mut metadata = FragmentMetadata::new();

    let outcome = next_matching_frame(&mut source, &mut metadata, CONTACT, requested).unwrap();
    if matches {
        assert_eq!(outcome, frame(&[0x2a]));
    } else {
        assert_eq!(outcome, Outcome::Exhausted);
    }
}

#[rstest]
fn empty_source_is_exhausted() {
    let mut source = MemorySource::default();
    let mut metadata = FragmentMetadata::new();

    let outcome = next_matching_frame(&mut source, &mut metadata, CONTACT, FROM_CUSTOMER).unwrap();
    assert_eq!(outcome, Outcome::Exhausted);
    assert_eq!(source.polled(), 0);
}
