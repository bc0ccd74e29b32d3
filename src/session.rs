//! Remote media session setup.
//!
//! The network layer sits behind [`MediaService`]; this module validates the
//! session inputs, resolves the starting selector and hands back the raw byte
//! stream for the decoder.

use std::fmt;
use std::fs;
use std::io::{Cursor, Read};
use std::path::PathBuf;

use serde::Deserialize;

use crate::error::SessionError;
use crate::mkv::Element;

/// Where in the stream reading begins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartSelector {
    Earliest,
    AfterFragment(String),
}

impl StartSelector {
    /// Map a selector kind name onto a selector.
    ///
    /// Only `FRAGMENT_NUMBER` selects a fragment; anything else, including an
    /// absent or empty kind, reads from the earliest data.
    pub fn from_kind(kind: Option<&str>, fragment_number: &str) -> Self {
        match kind.map(str::trim) {
            Some("FRAGMENT_NUMBER") => StartSelector::AfterFragment(fragment_number.to_string()),
            _ => StartSelector::Earliest,
        }
    }
}

impl fmt::Display for StartSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StartSelector::Earliest => f.write_str("EARLIEST"),
            StartSelector::AfterFragment(n) => write!(f, "FRAGMENT_NUMBER: {}", n),
        }
    }
}

#[derive(Clone, Deserialize)]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    #[serde(default)]
    pub session_token: Option<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("session_token", &self.session_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

pub trait CredentialsProvider: Send + Sync {
    fn credentials(&self) -> Result<Credentials, SessionError>;
}

#[derive(Debug, Clone)]
pub struct StaticCredentials(pub Credentials);

impl CredentialsProvider for StaticCredentials {
    fn credentials(&self) -> Result<Credentials, SessionError> {
        Ok(self.0.clone())
    }
}

/// Reads `AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY` and, if set,
/// `AWS_SESSION_TOKEN`.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvCredentials;

impl CredentialsProvider for EnvCredentials {
    fn credentials(&self) -> Result<Credentials, SessionError> {
        let var = |name: &str| {
            std::env::var(name)
                .map_err(|_| SessionError::Credentials(format!("{} is not set", name)))
        };
        Ok(Credentials {
            access_key_id: var("AWS_ACCESS_KEY_ID")?,
            secret_access_key: var("AWS_SECRET_ACCESS_KEY")?,
            session_token: std::env::var("AWS_SESSION_TOKEN").ok(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct MediaRequest {
    pub endpoint: String,
    pub region: String,
    pub stream_name: String,
    pub selector: StartSelector,
    pub credentials: Credentials,
}

pub struct MediaPayload {
    pub status: u16,
    pub request_id: String,
    pub body: Box<dyn Read + Send>,
}

/// Network layer contract of the remote media store.
pub trait MediaService {
    /// Endpoint serving media reads for `stream_name`.
    fn data_endpoint(&self, stream_name: &str) -> Result<String, SessionError>;

    fn get_media(&self, request: MediaRequest) -> Result<MediaPayload, SessionError>;
}

/// Session inputs. All four are mandatory; see [`StreamSession::open`].
#[derive(Default)]
pub struct StreamSession<'a> {
    stream_name: Option<String>,
    region: Option<String>,
    start_fragment_number: Option<String>,
    selector_kind: Option<String>,
    credentials: Option<&'a dyn CredentialsProvider>,
}

impl<'a> StreamSession<'a> {
    pub fn builder() -> Self {
        Self::default()
    }

    pub fn stream_name(mut self, stream_name: impl Into<String>) -> Self {
        self.stream_name = Some(stream_name.into());
        self
    }

    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn start_fragment_number(mut self, fragment_number: impl Into<String>) -> Self {
        self.start_fragment_number = Some(fragment_number.into());
        self
    }

    pub fn selector_kind(mut self, kind: Option<impl Into<String>>) -> Self {
        self.selector_kind = kind.map(Into::into);
        self
    }

    pub fn credentials(mut self, provider: &'a dyn CredentialsProvider) -> Self {
        self.credentials = Some(provider);
        self
    }

    /// Open the media stream through `service`.
    ///
    /// Missing inputs are rejected before the service is contacted.
    pub fn open<M: MediaService + ?Sized>(
        self,
        service: &M,
    ) -> Result<Box<dyn Read + Send>, SessionError> {
        let stream_name = self
            .stream_name
            .filter(|s| !s.is_empty())
            .ok_or(SessionError::MissingInput("stream name"))?;
        let region = self
            .region
            .filter(|r| !r.is_empty())
            .ok_or(SessionError::MissingInput("region"))?;
        let fragment_number = self
            .start_fragment_number
            .ok_or(SessionError::MissingInput("start fragment number"))?;
        let provider = self
            .credentials
            .ok_or(SessionError::MissingInput("credentials"))?;

        let credentials = provider.credentials()?;
        let endpoint = service.data_endpoint(&stream_name)?;

        let selector = StartSelector::from_kind(self.selector_kind.as_deref(), &fragment_number);
        log::info!("StartSelector set to {}", selector);

        let payload = service.get_media(MediaRequest {
            endpoint,
            region,
            stream_name: stream_name.clone(),
            selector,
            credentials,
        })?;
        log::info!(
            "GetMedia called on stream {} response {} requestId {}",
            stream_name,
            payload.status,
            payload.request_id
        );

        Ok(payload.body)
    }
}

/// Serves element dumps recorded earlier, one `<stream>.jsonl` file per stream.
#[derive(Debug, Clone)]
pub struct ReplayMediaService {
    dir: PathBuf,
}

impl ReplayMediaService {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl MediaService for ReplayMediaService {
    fn data_endpoint(&self, stream_name: &str) -> Result<String, SessionError> {
        let path = self.dir.join(format!("{}.jsonl", stream_name));
        if !path.is_file() {
            return Err(SessionError::Service(format!(
                "No recording for stream {} at {}",
                stream_name,
                path.display()
            )));
        }
        Ok(format!("file://{}", path.display()))
    }

    fn get_media(&self, request: MediaRequest) -> Result<MediaPayload, SessionError> {
        let path = self.dir.join(format!("{}.jsonl", request.stream_name));
        let recording = fs::read_to_string(&path)?;

        let body = match &request.selector {
            StartSelector::Earliest => recording,
            StartSelector::AfterFragment(number) => skip_through_fragment(&recording, number)
                .ok_or_else(|| {
                    SessionError::Service(format!(
                        "Fragment {} not found in stream {}",
                        number, request.stream_name
                    ))
                })?
                .to_string(),
        };

        Ok(MediaPayload {
            status: 200,
            request_id: uuid::Uuid::new_v4().to_string(),
            body: Box::new(Cursor::new(body.into_bytes())),
        })
    }
}

/// Suffix of a JSON-lines recording starting at the fragment that follows
/// fragment `number`. Empty when `number` is the last fragment.
fn skip_through_fragment<'r>(recording: &'r str, number: &str) -> Option<&'r str> {
    let mut offset = 0;
    let mut found = false;
    for line in recording.split_inclusive('\n') {
        if let Ok(Element::FragmentStart { fragment_number }) =
            serde_json::from_str::<Element>(line.trim())
        {
            if found {
                return Some(&recording[offset..]);
            }
            found = fragment_number.as_deref() == Some(number);
        }
        offset += line.len();
    }
    found.then_some("")
}
