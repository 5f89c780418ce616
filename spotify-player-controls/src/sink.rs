use std::{io::Cursor, sync::Arc, time::Duration};

use rodio::{OutputStream, OutputStreamBuilder, Sink, decoder::DecoderBuilder};
use tokio::{
    sync::mpsc::{self, UnboundedReceiver, UnboundedSender},
    task::JoinHandle,
};
use tracing::debug;

use crate::{
    Result,
    media::{LoadId, MediaBackend, MediaEvent, MediaHandle},
};

/// Plays preview clips on the default output device.
pub struct RodioBackend {
    stream: Option<OutputStream>,
    http: reqwest::Client,
    events: UnboundedSender<MediaEvent>,
}

impl RodioBackend {
    /// The receiver yields the media events of every handle this backend opens.
    pub fn new() -> (Self, UnboundedReceiver<MediaEvent>) {
        let (events, rx) = mpsc::unbounded_channel();

        let backend = Self {
            stream: None,
            http: reqwest::Client::new(),
            events,
        };

        (backend, rx)
    }
}

impl MediaBackend for RodioBackend {
    type Handle = RodioHandle;

    fn open(&mut self, load: LoadId, source: &str) -> Result<RodioHandle> {
        let stream = match self.stream.take() {
            Some(stream) => stream,
            None => {
                let mut stream = OutputStreamBuilder::open_default_stream()?;
                stream.log_on_drop(false);
                stream
            }
        };

        let sink = Arc::new(Sink::connect_new(stream.mixer()));
        self.stream = Some(stream);
        sink.pause();

        let task = tokio::spawn(stream_preview(
            self.http.clone(),
            source.to_string(),
            sink.clone(),
            load,
            self.events.clone(),
        ));

        Ok(RodioHandle { sink, task })
    }
}

pub struct RodioHandle {
    sink: Arc<Sink>,
    task: JoinHandle<()>,
}

impl MediaHandle for RodioHandle {
    fn play(&mut self) {
        self.sink.play();
    }

    fn pause(&mut self) {
        self.sink.pause();
    }

    fn seek(&mut self, position: Duration) -> Result<()> {
        self.sink.try_seek(position)?;
        Ok(())
    }

    fn set_volume(&mut self, volume: f32) {
        set_volume(&self.sink, volume);
    }

    fn position(&self) -> Duration {
        self.sink.get_pos()
    }

    fn stop(&mut self) {
        self.task.abort();
        self.sink.stop();
    }
}

impl Drop for RodioHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn stream_preview(
    http: reqwest::Client,
    url: String,
    sink: Arc<Sink>,
    load: LoadId,
    events: UnboundedSender<MediaEvent>,
) {
    let bytes = match fetch(&http, &url).await {
        Ok(bytes) => bytes,
        Err(e) => {
            emit(&events, MediaEvent::error(load, e.to_string()));
            return;
        }
    };

    let source = match DecoderBuilder::new()
        .with_data(Cursor::new(bytes))
        .with_seekable(true)
        .build()
    {
        Ok(source) => source,
        Err(e) => {
            emit(&events, MediaEvent::error(load, format!("unable to decode preview: {e}")));
            return;
        }
    };

    sink.append(source);
    emit(&events, MediaEvent::ready(load));

    if tokio::task::spawn_blocking(move || sink.sleep_until_end())
        .await
        .is_ok()
    {
        emit(&events, MediaEvent::ended(load));
    }
}

async fn fetch(http: &reqwest::Client, url: &str) -> Result<Vec<u8>> {
    debug!("downloading {url}");
    let bytes = http
        .get(url)
        .send()
        .await?
        .error_for_status()?
        .bytes()
        .await?;

    Ok(bytes.to_vec())
}

fn emit(events: &UnboundedSender<MediaEvent>, event: MediaEvent) {
    if events.send(event).is_err() {
        debug!("media event dropped, player loop is gone");
    }
}

fn set_volume(sink: &Sink, volume: f32) {
    let volume = volume.clamp(0.0, 1.0).powi(3);
    sink.set_volume(volume);
}
