//! stacktwin CLI - コマンドラインインターフェース
//!
//! 2つの JVM にアタッチし、片方で発見したコールチェーンをもう片方で再生して
//! 各停止のスタックをファイルへ書き出します。

mod config;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use config::{Settings, TraceArgs};
use stacktwin_core::Tracer;
use stacktwin_target::JdwpSession;
use stacktwin_trace::open_output;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// stacktwin - two-phase JVM stack tracer
#[derive(Parser)]
#[command(name = "stacktwin")]
#[command(version)]
#[command(about = "Discovers a call chain in one JVM and dumps every frame of it from a twin JVM", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: TraceCommand,
}

#[derive(Subcommand)]
enum TraceCommand {
    /// Discover the call chain, replay it and write every stop to the output file
    Trace(TraceArgs),

    /// Discover the call chain only and print it
    Chain(TraceArgs),
}

fn main() -> Result<()> {
    init_logging();

    let cli = Cli::parse();
    match cli.command {
        TraceCommand::Trace(args) => run_trace(&Settings::from_args(args)?),
        TraceCommand::Chain(args) => run_chain(&Settings::from_args(args)?),
    }
}

/// 診断ログは stderr に出し、トレース出力と混ざらないようにする
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Ctrl-C で停止待ちを打ち切る。出力とセッションは通常の失敗時と同じく閉じられる
fn cancel_on_interrupt(tracer: &Tracer) -> Result<()> {
    let cancel = tracer.cancellation_token();
    ctrlc::set_handler(move || cancel.cancel()).context("Failed to install Ctrl-C handler")
}

fn attach(address: &stacktwin_target::SessionAddress, role: &str) -> Result<JdwpSession> {
    let session = JdwpSession::attach(address)
        .with_context(|| format!("Failed to attach {} session at {}", role, address))?;
    info!("Attached {} session at {}", role, address);
    Ok(session)
}

/// 発見と再生を実行する
fn run_trace(settings: &Settings) -> Result<()> {
    let replay_address = settings
        .replay
        .as_ref()
        .context("Missing replay address (use --replay or `replay` in the config file)")?;
    let tracer = Tracer::new(settings.trace_options());
    cancel_on_interrupt(&tracer)?;

    let mut discovery_session = attach(&settings.discovery, "discovery")?;
    let discovery = tracer.discover(&mut discovery_session)?;
    info!(
        "Call chain of {} method(s) ends at {}",
        discovery.chain().len(),
        discovery.trigger()
    );

    let mut replay_session = attach(replay_address, "replay")?;
    let (path, logger) = open_output(
        settings.format,
        &settings.output,
        settings.extension.as_deref(),
    )?;
    info!("Writing {} trace to {}", settings.format, path.display());

    let summary = tracer.replay(discovery, &mut replay_session, logger)?;
    info!("Trace complete: {}", summary);
    for skipped in &summary.skipped {
        info!("Skipped (not resolvable in replay session): {}", skipped);
    }
    println!("{}", path.display());

    Ok(())
}

/// 発見フェーズだけを実行してチェーンを表示する
fn run_chain(settings: &Settings) -> Result<()> {
    let tracer = Tracer::new(settings.trace_options());
    cancel_on_interrupt(&tracer)?;
    let mut session = attach(&settings.discovery, "discovery")?;
    let discovery = tracer.discover(&mut session)?;

    println!(
        "Call chain on thread '{}' at {} ({} frames, innermost first):",
        discovery.thread_name(),
        discovery.trigger(),
        discovery.chain().len()
    );
    for (i, method) in discovery.chain().iter().enumerate() {
        println!("  #{} {}", i, method);
    }

    Ok(())
}
