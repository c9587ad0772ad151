use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

const LOG_FILE_PREFIX: &str = "radio-ratui.log";
const DEFAULT_FILTER: &str = "info,reqwest=warn,hyper=warn,symphonia=warn";

/// 持有 appender 后台线程；drop 时把缓冲写完
pub struct LogGuard {
    _worker: Option<WorkerGuard>,
    dir: PathBuf,
}

impl LogGuard {
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[derive(Debug, Clone, Default)]
pub struct LogConfig {
    pub dir: Option<PathBuf>,
    pub filter: Option<String>,
    /// 非 TUI 模式下把 warn 以上同时打到 stderr（TUI 占着终端时必须关掉）
    pub stderr: bool,
}

/// 日志按天滚动写到 `{data_dir}/logs`；目录不可写时退回系统临时目录
pub fn init(data_dir: &Path, cfg: LogConfig) -> LogGuard {
    let wanted = cfg.dir.unwrap_or_else(|| data_dir.join("logs"));
    let log_dir = match fs::create_dir_all(&wanted) {
        Ok(()) => wanted,
        Err(_) => {
            let tmp = std::env::temp_dir().join("radio-ratui-logs");
            let _ = fs::create_dir_all(&tmp);
            tmp
        }
    };

    let file_appender = tracing_appender::rolling::daily(&log_dir, LOG_FILE_PREFIX);
    let (file_writer, worker) = tracing_appender::non_blocking(file_appender);

    let filter = match cfg.filter {
        Some(s) if !s.trim().is_empty() => EnvFilter::new(s),
        _ => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)),
    };

    let file_layer = fmt::layer()
        .with_ansi(false)
        .with_target(true)
        .with_thread_names(true)
        .with_writer(file_writer)
        .with_filter(filter);

    let stderr_layer = cfg.stderr.then(|| {
        fmt::layer()
            .with_target(false)
            .with_writer(io::stderr)
            .with_filter(LevelFilter::WARN)
    });

    let _ = tracing_subscriber::registry()
        .with(file_layer)
        .with(stderr_layer)
        .try_init();
    tracing::info!(log_dir = %log_dir.display(), "tracing 已初始化");

    LogGuard {
        _worker: Some(worker),
        dir: log_dir,
    }
}
