use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "radio-ratui", version, about = "电台同步收听 TUI 客户端（Rust + ratatui）")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// 电台服务端地址
    #[arg(long, env = "RADIO_SERVER")]
    pub server: Option<String>,

    /// 覆盖数据目录（默认走系统 data_local_dir）
    #[arg(long, env = "RADIO_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// 覆盖日志目录（默认 `{data_dir}/logs`）
    #[arg(long, env = "RADIO_LOG_DIR")]
    pub log_dir: Option<PathBuf>,

    /// 覆盖日志过滤（等价于设置 RUST_LOG）
    #[arg(long, env = "RUST_LOG")]
    pub log_filter: Option<String>,

    /// 不打开音频设备，只跑同步逻辑（也可设置 RADIO_NO_AUDIO=1）
    #[arg(long)]
    pub no_audio: bool,

    /// 不构建 EQ 滤波链
    #[arg(long)]
    pub no_eq: bool,

    /// 交叉淡化秒数（覆盖设置文件）
    #[arg(long)]
    pub crossfade: Option<f32>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// 运行 TUI（默认）
    Tui,

    /// 打印一次广播状态（JSON）
    Status,

    /// 把曲目加入优先队列
    QueueAdd { id: String },

    /// 从优先队列移除曲目
    QueueRemove { id: String },

    /// 给当前曲目评分（1-5）
    Vote {
        #[arg(value_parser = clap::value_parser!(u8).range(1..=5))]
        rating: u8,
    },

    /// 请求服务端切到下一首
    Skip,

    /// 修改曲库中的单曲属性
    LibraryUpdate {
        id: String,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        category: Option<String>,

        /// 单曲音量 0..=1
        #[arg(long)]
        volume: Option<f32>,

        #[arg(long, allow_hyphen_values = true)]
        low: Option<f32>,

        #[arg(long, allow_hyphen_values = true)]
        mid: Option<f32>,

        #[arg(long, allow_hyphen_values = true)]
        high: Option<f32>,

        #[arg(long)]
        trim_start: Option<f64>,

        #[arg(long)]
        trim_end: Option<f64>,

        /// 封面图片路径
        #[arg(long)]
        artwork: Option<PathBuf>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_defaults_to_tui() {
        let cli = Cli::try_parse_from(["radio-ratui", "--no-audio"]).expect("parse");
        assert!(cli.command.is_none());
        assert!(cli.no_audio);
    }

    #[test]
    fn test_vote_range_checked() {
        assert!(Cli::try_parse_from(["radio-ratui", "vote", "6"]).is_err());
        let cli = Cli::try_parse_from(["radio-ratui", "vote", "4"]).expect("parse");
        assert!(matches!(cli.command, Some(Command::Vote { rating: 4 })));
    }

    #[test]
    fn test_library_update_negative_eq() {
        let cli = Cli::try_parse_from([
            "radio-ratui",
            "library-update",
            "t1",
            "--low",
            "-3.5",
            "--volume",
            "0.8",
        ])
        .expect("parse");
        match cli.command {
            Some(Command::LibraryUpdate { id, low, volume, .. }) => {
                assert_eq!(id, "t1");
                assert_eq!(low, Some(-3.5));
                assert_eq!(volume, Some(0.8));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }
}
