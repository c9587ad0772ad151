use super::eq::FilterGraph;
use super::output::{DeckOutput, OutputSignal, SignalSender};
use crate::error::AudioError;
use futures_util::StreamExt;
use reqwest::StatusCode;
use rodio::mixer::Mixer;
use rodio::{Decoder, Sink};
use std::io::{BufReader, Seek, SeekFrom};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tokio::io::AsyncWriteExt;

const NO_SEEK: u64 = u64::MAX;
const DOWNLOAD_RETRIES: u32 = 1;
const RETRY_BACKOFF: Duration = Duration::from_millis(400);

struct LoadedSink {
    load_id: u64,
    sink: Arc<Sink>,
    ready: Arc<AtomicBool>,
    cancel: Arc<AtomicBool>,
    pending_seek_ms: Arc<AtomicU64>,
}

/// rodio 实现：每次 load 新建一个 Sink，下载到匿名临时文件后解码挂上去
pub struct RodioOutput {
    slot: usize,
    mixer: Mixer,
    http: reqwest::Client,
    tx_signal: SignalSender,
    graph: Option<FilterGraph>,
    current: Option<LoadedSink>,
    volume: f32,
}

impl RodioOutput {
    pub fn new(
        slot: usize,
        mixer: Mixer,
        http: reqwest::Client,
        tx_signal: SignalSender,
        with_filter_graph: bool,
    ) -> Self {
        Self {
            slot,
            mixer,
            http,
            tx_signal,
            graph: with_filter_graph.then(FilterGraph::new),
            current: None,
            volume: 1.0,
        }
    }
}

impl DeckOutput for RodioOutput {
    fn load(&mut self, url: &str, load_id: u64) {
        self.unload();

        let sink = Arc::new(Sink::connect_new(&self.mixer));
        sink.pause();
        sink.set_volume(self.volume);
        let loaded = LoadedSink {
            load_id,
            sink,
            ready: Arc::new(AtomicBool::new(false)),
            cancel: Arc::new(AtomicBool::new(false)),
            pending_seek_ms: Arc::new(AtomicU64::new(NO_SEEK)),
        };

        let job = LoadJob {
            slot: self.slot,
            load_id,
            url: url.to_owned(),
            http: self.http.clone(),
            sink: Arc::clone(&loaded.sink),
            ready: Arc::clone(&loaded.ready),
            cancel: Arc::clone(&loaded.cancel),
            pending_seek_ms: Arc::clone(&loaded.pending_seek_ms),
            graph: self.graph.clone(),
            tx_signal: self.tx_signal.clone(),
        };
        tracing::debug!(slot = self.slot, load_id, url, "deck 开始加载");
        tokio::spawn(job.run());
        self.current = Some(loaded);
    }

    fn unload(&mut self) {
        if let Some(cur) = self.current.take() {
            tracing::debug!(slot = self.slot, load_id = cur.load_id, "释放 deck 音源");
            cur.cancel.store(true, Ordering::SeqCst);
            cur.sink.stop();
        }
    }

    fn try_seek(&mut self, position: Duration) -> bool {
        let Some(cur) = self.current.as_ref() else {
            return false;
        };
        if !cur.ready.load(Ordering::SeqCst) {
            cur.pending_seek_ms
                .store(position.as_millis() as u64, Ordering::SeqCst);
            return false;
        }
        match cur.sink.try_seek(position) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(slot = self.slot, pos_ms = position.as_millis() as u64, err = %e, "Seek 失败");
                false
            }
        }
    }

    fn play(&mut self) -> Result<(), AudioError> {
        let Some(cur) = self.current.as_ref() else {
            return Err(AudioError::NoSource(self.slot));
        };
        cur.sink.play();
        Ok(())
    }

    fn pause(&mut self) {
        if let Some(cur) = self.current.as_ref() {
            cur.sink.pause();
        }
    }

    fn is_paused(&self) -> bool {
        self.current.as_ref().is_none_or(|c| c.sink.is_paused())
    }

    fn position(&self) -> Duration {
        self.current
            .as_ref()
            .map(|c| c.sink.get_pos())
            .unwrap_or_default()
    }

    fn is_drained(&self) -> bool {
        self.current
            .as_ref()
            .is_some_and(|c| c.ready.load(Ordering::SeqCst) && c.sink.empty())
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume;
        if let Some(cur) = self.current.as_ref() {
            cur.sink.set_volume(volume);
        }
    }

    fn filter_graph(&self) -> Option<&FilterGraph> {
        self.graph.as_ref()
    }
}

impl Drop for RodioOutput {
    fn drop(&mut self) {
        self.unload();
    }
}

struct LoadJob {
    slot: usize,
    load_id: u64,
    url: String,
    http: reqwest::Client,
    sink: Arc<Sink>,
    ready: Arc<AtomicBool>,
    cancel: Arc<AtomicBool>,
    pending_seek_ms: Arc<AtomicU64>,
    graph: Option<FilterGraph>,
    tx_signal: SignalSender,
}

impl LoadJob {
    async fn run(self) {
        let result = self.fetch_and_attach().await;
        if self.cancel.load(Ordering::SeqCst) {
            tracing::debug!(slot = self.slot, load_id = self.load_id, "加载已被取消");
            return;
        }
        let signal = match result {
            Ok(()) => OutputSignal::Ready {
                slot: self.slot,
                load_id: self.load_id,
            },
            Err(e) => {
                tracing::warn!(slot = self.slot, load_id = self.load_id, url = %self.url, err = %e, "deck 加载失败");
                OutputSignal::Failed {
                    slot: self.slot,
                    load_id: self.load_id,
                    message: e.to_string(),
                }
            }
        };
        let _ = self.tx_signal.send(signal);
    }

    async fn fetch_and_attach(&self) -> Result<(), AudioError> {
        let file = download_to_tempfile(&self.http, &self.url).await?;
        let decoder = Decoder::new(BufReader::new(file)).map_err(|e| AudioError::Decode {
            url: self.url.clone(),
            source: Box::new(e),
        })?;
        if self.cancel.load(Ordering::SeqCst) {
            return Ok(());
        }

        match &self.graph {
            Some(graph) => self.sink.append(graph.wrap(decoder)),
            None => self.sink.append(decoder),
        }
        self.ready.store(true, Ordering::SeqCst);

        // 元数据就绪后补做 load 期间请求的 seek
        let pending = self.pending_seek_ms.swap(NO_SEEK, Ordering::SeqCst);
        if pending != NO_SEEK
            && let Err(e) = self.sink.try_seek(Duration::from_millis(pending))
        {
            tracing::warn!(slot = self.slot, pos_ms = pending, err = %e, "就绪后 Seek 失败");
        }
        Ok(())
    }
}

async fn download_to_tempfile(
    http: &reqwest::Client,
    url: &str,
) -> Result<std::fs::File, AudioError> {
    let mut last_err = String::new();

    for attempt in 0..=DOWNLOAD_RETRIES {
        if attempt > 0 {
            tokio::time::sleep(RETRY_BACKOFF * attempt).await;
        }

        let resp = match http.get(url).send().await {
            Ok(r) => r,
            Err(e) => {
                last_err = e.to_string();
                continue;
            }
        };
        let status = resp.status();
        if !status.is_success() {
            last_err = format!("HTTP {status}");
            if is_retryable_status(status) {
                continue;
            }
            break;
        }

        // 匿名临时文件：句柄关闭后自动回收
        let mut out = tokio::fs::File::from_std(tempfile::tempfile()?);
        let mut stream = resp.bytes_stream();
        let mut failed = None::<String>;
        while let Some(chunk) = stream.next().await {
            match chunk {
                Ok(bytes) => out.write_all(&bytes).await?,
                Err(e) => {
                    failed = Some(e.to_string());
                    break;
                }
            }
        }
        if let Some(err) = failed {
            last_err = err;
            continue;
        }
        out.flush().await?;

        let mut file = out.into_std().await;
        file.seek(SeekFrom::Start(0))?;
        return Ok(file);
    }

    Err(AudioError::Download {
        url: url.to_owned(),
        message: last_err,
    })
}

fn is_retryable_status(status: StatusCode) -> bool {
    status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS
        || status.is_server_error()
}
