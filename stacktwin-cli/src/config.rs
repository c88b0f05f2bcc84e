//! 設定の読み込みと解決
//!
//! コマンドライン引数、TOML 設定ファイル、組み込みの既定値の順に優先します。

use anyhow::{Context, Result};
use clap::Args;
use serde::Deserialize;
use stacktwin_core::parse::parse_method_descriptor;
use stacktwin_core::{ReplayOrder, TraceOptions};
use stacktwin_target::{MethodDescriptor, SessionAddress};
use stacktwin_trace::LoggerFormat;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_OUTPUT: &str = "trace";
const DEFAULT_THREAD: &str = "main";
const DEFAULT_POLL_INTERVAL_MS: u64 = 5;

/// 実行設定のコマンドライン引数
#[derive(Args, Debug, Default)]
pub struct TraceArgs {
    /// TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Discovery JVM address (host:port or port)
    #[arg(short, long)]
    pub discovery: Option<String>,

    /// Replay JVM address (host:port or port)
    #[arg(short, long)]
    pub replay: Option<String>,

    /// Name of the thread to follow
    #[arg(short, long)]
    pub thread: Option<String>,

    /// Trigger method, e.g. pkg.Class.method(int, java.lang.String)
    #[arg(long)]
    pub trigger: Option<String>,

    /// Output format (txt or json)
    #[arg(short, long)]
    pub format: Option<LoggerFormat>,

    /// Output file name without extension
    #[arg(short, long)]
    pub output: Option<String>,

    /// Output file extension (defaults to the format's extension)
    #[arg(long)]
    pub extension: Option<String>,

    /// Maximum extraction depth (0 = unlimited)
    #[arg(long)]
    pub max_depth: Option<usize>,

    /// Order in which the call chain is replayed
    #[arg(long)]
    pub replay_order: Option<ReplayOrder>,

    /// Interval between thread state polls in milliseconds
    #[arg(long)]
    pub poll_interval_ms: Option<u64>,

    /// Give up waiting for a stop after this many milliseconds
    #[arg(long)]
    pub timeout_ms: Option<u64>,
}

/// 設定ファイルの内容
#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub discovery: Option<String>,
    pub replay: Option<String>,
    pub thread: Option<String>,
    pub trigger: Option<String>,
    pub format: Option<LoggerFormat>,
    pub output: Option<String>,
    pub extension: Option<String>,
    pub max_depth: Option<usize>,
    pub replay_order: Option<ReplayOrder>,
    pub poll_interval_ms: Option<u64>,
    pub timeout_ms: Option<u64>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }
}

/// 解決済みの設定
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub discovery: SessionAddress,
    pub replay: Option<SessionAddress>,
    pub thread: String,
    pub trigger: MethodDescriptor,
    pub format: LoggerFormat,
    pub output: String,
    pub extension: Option<String>,
    pub max_depth: usize,
    pub replay_order: ReplayOrder,
    pub poll_interval: Duration,
    pub timeout: Option<Duration>,
}

impl Settings {
    /// 引数（と `--config` があればそのファイル）から設定を解決する
    pub fn from_args(args: TraceArgs) -> Result<Self> {
        let file = match &args.config {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };
        Self::resolve(args, file)
    }

    pub fn resolve(args: TraceArgs, file: FileConfig) -> Result<Self> {
        let discovery = args
            .discovery
            .or(file.discovery)
            .context("Missing discovery address (use --discovery or `discovery` in the config file)")?;
        let discovery: SessionAddress = discovery
            .parse()
            .with_context(|| format!("Invalid discovery address '{}'", discovery))?;

        let replay = match args.replay.or(file.replay) {
            Some(addr) => Some(
                addr.parse::<SessionAddress>()
                    .with_context(|| format!("Invalid replay address '{}'", addr))?,
            ),
            None => None,
        };

        let trigger = args
            .trigger
            .or(file.trigger)
            .context("Missing trigger method (use --trigger or `trigger` in the config file)")?;
        let trigger = parse_method_descriptor(&trigger)?;

        Ok(Self {
            discovery,
            replay,
            thread: args
                .thread
                .or(file.thread)
                .unwrap_or_else(|| DEFAULT_THREAD.to_string()),
            trigger,
            format: args.format.or(file.format).unwrap_or_default(),
            output: args
                .output
                .or(file.output)
                .unwrap_or_else(|| DEFAULT_OUTPUT.to_string()),
            extension: args.extension.or(file.extension),
            max_depth: args.max_depth.or(file.max_depth).unwrap_or(0),
            replay_order: args.replay_order.or(file.replay_order).unwrap_or_default(),
            poll_interval: Duration::from_millis(
                args.poll_interval_ms
                    .or(file.poll_interval_ms)
                    .unwrap_or(DEFAULT_POLL_INTERVAL_MS),
            ),
            timeout: args
                .timeout_ms
                .or(file.timeout_ms)
                .map(Duration::from_millis),
        })
    }

    pub fn trace_options(&self) -> TraceOptions {
        TraceOptions {
            thread_name: self.thread.clone(),
            trigger: self.trigger.clone(),
            max_depth: self.max_depth,
            replay_order: self.replay_order,
            poll_interval: self.poll_interval,
            timeout: self.timeout,
        }
    }
}
