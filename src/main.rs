use std::io::BufReader;
use std::path::PathBuf;
use std::thread;

use anyhow::Context;
use bytes::Bytes;
use tokio::signal;
use tokio::sync::{mpsc, oneshot};

use kvs_audio::chunk::ChunkAggregator;
use kvs_audio::config::AppConfig;
use kvs_audio::mkv::JsonLinesSource;
use kvs_audio::net_link::{FileSink, NetLink};
use kvs_audio::session::{
    CredentialsProvider, EnvCredentials, ReplayMediaService, StaticCredentials, StreamSession,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));
    let config = AppConfig::load(&config_path)
        .with_context(|| format!("Failed to load configuration from {}", config_path.display()))?;

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.log.level.as_str()),
    )
    .init();

    anyhow::ensure!(
        config.extraction.chunk_frames > 0,
        "extraction.chunk_frames must be at least 1"
    );

    let (tx_chunk, rx_chunk) = mpsc::channel::<Bytes>(config.forward.channel_capacity);

    // Extraction blocks on the media stream, so it gets its own OS thread.
    let (tx_done, mut rx_done) = oneshot::channel::<anyhow::Result<()>>();
    {
        let config = config.clone();
        thread::Builder::new()
            .name("kvs-extract".into())
            .spawn(move || {
                let _ = tx_done.send(extract_thread(&config, tx_chunk));
            })?;
    }

    let forward = async {
        if config.forward.ws_url.is_some() {
            NetLink::new(
                config.forward.clone(),
                config.extraction.contact_id.as_str(),
                config.extraction.track.as_str(),
                rx_chunk,
            )?
            .run()
            .await;
        } else {
            FileSink::new(&config.forward.output_path, rx_chunk)
                .run()
                .await?;
        }
        Ok::<(), anyhow::Error>(())
    };

    log::info!(
        "Extracting {} for contact {} from stream {}",
        config.extraction.track,
        config.extraction.contact_id,
        config.stream.name
    );

    tokio::pin!(forward);
    let mut forwarded = false;
    let extracted = tokio::select! {
        _ = signal::ctrl_c() => {
            // The extraction thread has no cancellation point; exiting tears
            // down the media stream under it.
            log::info!("Received Ctrl+C, shutting down...");
            return Ok(());
        }
        res = &mut rx_done => res,
        res = &mut forward => {
            res?;
            forwarded = true;
            (&mut rx_done).await
        }
    };
    // An extraction error is reported even while the forwarder is still
    // waiting for its endpoint.
    extracted.map_err(|_| anyhow::anyhow!("Extraction thread panicked"))??;

    if !forwarded {
        tokio::select! {
            _ = signal::ctrl_c() => log::info!("Received Ctrl+C, shutting down..."),
            res = &mut forward => res?,
        }
    }
    Ok(())
}

fn extract_thread(config: &AppConfig, tx_chunk: mpsc::Sender<Bytes>) -> anyhow::Result<()> {
    let credentials: Box<dyn CredentialsProvider> = match &config.credentials {
        Some(creds) => Box::new(StaticCredentials(creds.clone())),
        None => Box::new(EnvCredentials),
    };
    let service = ReplayMediaService::new(&config.stream.replay_dir);

    let mut session = StreamSession::builder()
        .stream_name(config.stream.name.as_str())
        .region(config.stream.region.as_str())
        .selector_kind(config.stream.start_selector.as_deref())
        .credentials(&*credentials);
    if let Some(fragment_number) = &config.stream.start_fragment_number {
        session = session.start_fragment_number(fragment_number.as_str());
    }
    let body = session.open(&service)?;

    let mut aggregator = ChunkAggregator::new(JsonLinesSource::new(BufReader::new(body)))
        .with_max_attempts(config.extraction.attempt_limit());
    let contact_id = config.extraction.contact_id.as_str();
    let track = config.extraction.track.as_str();

    let mut chunks = 0usize;
    while !aggregator.is_exhausted() {
        let chunk = aggregator.collect_chunk(contact_id, config.extraction.chunk_frames, track)?;
        if chunk.is_empty() {
            continue;
        }
        chunks += 1;
        if tx_chunk.blocking_send(chunk.data).is_err() {
            log::warn!("Chunk receiver dropped, stopping extraction");
            break;
        }
    }

    log::info!("Extraction finished after {} chunks", chunks);
    Ok(())
}
