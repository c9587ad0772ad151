//! 引擎 actor：独立线程上的单线程 runtime + LocalSet，串行处理所有输入

use super::core::{EngineEffect, EngineInput, EngineOptions, SyncEngine};
use super::deck::MasterGain;
use super::messages::{EngineEvent, PlayerCommand, PlayerSnapshot};
use super::output::{DeckOutput, NullOutput, SignalSender};
use super::poller::{PollerHandle, spawn_poller};
use super::pool::DeckPool;
use super::rodio_output::RodioOutput;
use crate::api::{LibraryUpdate, RadioClient};
use crate::error::AudioError;
use crate::settings::{AppSettings, save_settings};
use rodio::{OutputStream, OutputStreamBuilder};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio::select;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::time::MissedTickBehavior;

const TICK: Duration = Duration::from_millis(20);
/// 只有 tick 时，状态快照最多这么频繁地推给 UI
const PUBLISH_EVERY: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioBackend {
    Rodio,
    /// 不出声，只跑同步逻辑
    Null,
}

pub struct EngineConfig {
    pub client: RadioClient,
    pub settings: AppSettings,
    pub data_dir: PathBuf,
    pub backend: AudioBackend,
}

#[derive(Debug, Clone)]
pub struct EngineHandle {
    tx: mpsc::UnboundedSender<PlayerCommand>,
}

impl EngineHandle {
    pub fn send(&self, cmd: PlayerCommand) {
        if self.tx.send(cmd).is_err() {
            tracing::warn!("引擎已退出，命令被丢弃");
        }
    }
}

/// 启动引擎线程。所有 `EngineHandle` 丢弃后引擎退出
pub fn spawn_engine(
    cfg: EngineConfig,
) -> std::io::Result<(EngineHandle, mpsc::Receiver<EngineEvent>)> {
    let (tx_cmd, rx_cmd) = mpsc::unbounded_channel();
    let (tx_evt, rx_evt) = mpsc::channel(64);

    std::thread::Builder::new()
        .name("radio-engine".to_owned())
        .spawn(move || {
            let rt = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(rt) => rt,
                Err(e) => {
                    tracing::error!(err = %e, "创建引擎 runtime 失败");
                    let _ = tx_evt.try_send(EngineEvent::Error(format!("创建引擎 runtime 失败: {e}")));
                    return;
                }
            };
            let local = tokio::task::LocalSet::new();
            local.block_on(&rt, run(cfg, rx_cmd, tx_evt));
        })?;

    Ok((EngineHandle { tx: tx_cmd }, rx_evt))
}

async fn run(
    cfg: EngineConfig,
    mut rx_cmd: mpsc::UnboundedReceiver<PlayerCommand>,
    tx_evt: mpsc::Sender<EngineEvent>,
) {
    let EngineConfig {
        client,
        settings,
        data_dir,
        backend,
    } = cfg;

    let http = match reqwest::Client::builder()
        .user_agent("radio-ratui")
        .connect_timeout(settings.http_timeout())
        .build()
    {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(err = %e, "初始化媒体 HTTP 客户端失败");
            let _ = tx_evt
                .send(EngineEvent::Error(format!("初始化媒体 HTTP 客户端失败: {e}")))
                .await;
            return;
        }
    };

    let (tx_signal, mut rx_signal) = mpsc::unbounded_channel();
    let (_stream, outputs) = match open_outputs(backend, settings.eq_enabled, http, tx_signal) {
        Ok(v) => v,
        Err((e, outputs)) => {
            tracing::error!(err = %e, "打开音频设备失败，改用静音输出");
            let _ = tx_evt
                .send(EngineEvent::Error(format!("{e}，改用静音输出")))
                .await;
            (None, outputs)
        }
    };

    let master = MasterGain {
        volume: settings.volume,
        muted: settings.muted,
    };
    let pool = DeckPool::new(outputs, master, Instant::now());
    let opts = EngineOptions {
        crossfade: settings.crossfade(),
        optimistic_stream: settings.optimistic_stream,
    };
    let engine = SyncEngine::new(pool, client.media_urls(), opts);

    let (tx_poll, mut rx_poll) = mpsc::unbounded_channel();
    let poller = spawn_poller(client.clone(), settings.poll_interval(), tx_poll);

    tracing::info!(
        server = %client.config().server,
        backend = ?backend,
        eq = settings.eq_enabled,
        "同步引擎已启动"
    );

    let mut actor = EngineActor {
        engine,
        client,
        settings,
        data_dir,
        tx_evt,
        poller,
        last_published: None,
        published_at: Instant::now(),
    };

    let mut tick = tokio::time::interval(TICK);
    tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        select! {
            biased;
            maybe_cmd = rx_cmd.recv() => {
                let Some(cmd) = maybe_cmd else {
                    break;
                };
                actor.dispatch(EngineInput::Command(cmd));
            }
            Some(signal) = rx_signal.recv() => {
                actor.dispatch(EngineInput::Signal(signal));
            }
            Some(input) = rx_poll.recv() => {
                actor.dispatch(input);
            }
            _ = tick.tick() => {
                actor.dispatch(EngineInput::Tick);
            }
        }
    }
    tracing::info!("同步引擎退出");
}

type Outputs = [Box<dyn DeckOutput>; 2];

fn null_outputs(tx_signal: &SignalSender) -> Outputs {
    [
        Box::new(NullOutput::new(0, tx_signal.clone())),
        Box::new(NullOutput::new(1, tx_signal.clone())),
    ]
}

/// 打开默认声卡并建好两个 deck；失败时带回静音输出
#[allow(clippy::type_complexity)]
fn open_outputs(
    backend: AudioBackend,
    eq_enabled: bool,
    http: reqwest::Client,
    tx_signal: SignalSender,
) -> Result<(Option<OutputStream>, Outputs), (AudioError, Outputs)> {
    if backend == AudioBackend::Null {
        return Ok((None, null_outputs(&tx_signal)));
    }
    let stream = OutputStreamBuilder::open_default_stream()
        .map_err(|e| (AudioError::OutputStream(e.to_string()), null_outputs(&tx_signal)))?;
    let mixer = stream.mixer().clone();
    let outputs: Outputs = [
        Box::new(RodioOutput::new(0, mixer.clone(), http.clone(), tx_signal.clone(), eq_enabled)),
        Box::new(RodioOutput::new(1, mixer, http, tx_signal, eq_enabled)),
    ];
    Ok((Some(stream), outputs))
}

struct EngineActor {
    engine: SyncEngine,
    client: RadioClient,
    settings: AppSettings,
    data_dir: PathBuf,
    tx_evt: mpsc::Sender<EngineEvent>,
    poller: PollerHandle,
    last_published: Option<PlayerSnapshot>,
    published_at: Instant,
}

impl EngineActor {
    fn dispatch(&mut self, input: EngineInput) {
        let is_tick = matches!(input, EngineInput::Tick);
        let now = Instant::now();
        let effects = self.engine.handle(input, now);
        for fx in effects {
            self.apply(fx);
        }
        if !is_tick || now.saturating_duration_since(self.published_at) >= PUBLISH_EVERY {
            self.publish(now);
        }
    }

    fn publish(&mut self, now: Instant) {
        let snap = self.engine.snapshot(now);
        self.published_at = now;
        if self.last_published.as_ref() == Some(&snap) {
            return;
        }
        // UI 处理不过来时丢掉中间状态，不阻塞淡化
        if deliver(&self.tx_evt, EngineEvent::State(Box::new(snap.clone()))) {
            self.last_published = Some(snap);
        }
    }

    fn apply(&mut self, fx: EngineEffect) {
        match fx {
            EngineEffect::PollSoon(after) => self.poller.poll_soon(after),
            EngineEffect::PromptInteraction(msg) => {
                deliver(&self.tx_evt, EngineEvent::NeedsInteraction(msg));
            }
            EngineEffect::Notice(msg) => {
                deliver(&self.tx_evt, EngineEvent::Toast(msg));
            }
            EngineEffect::SaveSettings {
                volume,
                muted,
                crossfade_secs,
            } => {
                self.settings.volume = volume;
                self.settings.muted = muted;
                self.settings.crossfade_secs = crossfade_secs;
                if let Err(e) = save_settings(&self.data_dir, &self.settings) {
                    tracing::warn!(err = %e, "保存设置失败");
                }
            }
            EngineEffect::RequestSkip(id) => {
                let client = self.client.clone();
                let tx_evt = self.tx_evt.clone();
                tokio::spawn(async move {
                    tracing::info!(track_id = %id, "请求服务端跳过无法播放的曲目");
                    if let Err(e) = client.skip().await {
                        tracing::warn!(track_id = %id, err = %e, "请求跳过失败");
                        deliver(&tx_evt, EngineEvent::Error(format!("请求跳过失败: {e}")));
                    }
                });
            }
            EngineEffect::SubmitVote { id, rating } => {
                let client = self.client.clone();
                let tx_evt = self.tx_evt.clone();
                tokio::spawn(async move {
                    match client.vote(&id, rating).await {
                        Ok(()) => tracing::info!(track_id = %id, rating, "评分已提交"),
                        Err(e) => {
                            tracing::warn!(track_id = %id, rating, err = %e, "评分失败");
                            deliver(&tx_evt, EngineEvent::Error(format!("评分失败: {e}")));
                        }
                    }
                });
            }
            EngineEffect::PersistTrack { id, volume, eq } => {
                let client = self.client.clone();
                let tx_evt = self.tx_evt.clone();
                let update = LibraryUpdate {
                    id,
                    volume: Some(volume),
                    eq: Some(eq),
                    ..Default::default()
                };
                tokio::spawn(async move {
                    let evt = match client.update_library(&update).await {
                        Ok(()) => {
                            tracing::info!(track_id = %update.id, "曲目 EQ 已保存");
                            EngineEvent::Toast("已保存当前曲目的 EQ".to_owned())
                        }
                        Err(e) => {
                            tracing::warn!(track_id = %update.id, err = %e, "保存曲目设置失败");
                            EngineEvent::Error(format!("保存曲目设置失败: {e}"))
                        }
                    };
                    deliver(&tx_evt, evt);
                });
            }
        }
    }
}

/// 发给 UI 的事件一律不等待：通道满了就丢弃并记日志，引擎 tick 不能被 UI 拖住
fn deliver(tx: &mpsc::Sender<EngineEvent>, evt: EngineEvent) -> bool {
    match tx.try_send(evt) {
        Ok(()) => true,
        Err(TrySendError::Full(evt)) => {
            if !matches!(evt, EngineEvent::State(_)) {
                tracing::warn!(event = ?evt, "UI 事件通道已满，丢弃事件");
            }
            false
        }
        Err(TrySendError::Closed(_)) => false,
    }
}
