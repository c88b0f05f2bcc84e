//! トレーサーのメインロジック
//!
//! 2つのセッションを順に駆動します。発見用セッション（A）でコールチェーンを
//! 記録して切断し、その後で再生用セッション（B）をチェーンに沿って停止させながら
//! 各停止の全フレームを抽出します。

use crate::discover::{CallChainDiscoverer, Discovery, ReplayOrder};
use crate::driver::{StackWalkDriver, WalkSummary};
use crate::extractor::{DepthBudget, StackExtractor};
use crate::sequencer::BreakpointSequencer;
use crate::wait::StopWaiter;
use crate::Result;
use stacktwin_target::{MethodDescriptor, Session};
use stacktwin_trace::TraceLogger;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// トレース実行の設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceOptions {
    /// 対象スレッド名
    pub thread_name: String,
    /// 発見フェーズのトリガーメソッド
    pub trigger: MethodDescriptor,
    /// 深さ上限（0 は無制限）
    pub max_depth: usize,
    pub replay_order: ReplayOrder,
    pub poll_interval: Duration,
    pub timeout: Option<Duration>,
}

impl TraceOptions {
    pub fn new(thread_name: impl Into<String>, trigger: MethodDescriptor) -> Self {
        Self {
            thread_name: thread_name.into(),
            trigger,
            max_depth: 0,
            replay_order: ReplayOrder::default(),
            poll_interval: Duration::from_millis(5),
            timeout: None,
        }
    }
}

/// トレーサー
pub struct Tracer {
    options: TraceOptions,
    cancel: CancellationToken,
}

impl Tracer {
    pub fn new(options: TraceOptions) -> Self {
        Self {
            options,
            cancel: CancellationToken::new(),
        }
    }

    pub fn options(&self) -> &TraceOptions {
        &self.options
    }

    /// 停止待ちをキャンセルするためのトークン
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    fn waiter(&self) -> StopWaiter {
        StopWaiter::new(self.options.poll_interval)
            .with_timeout(self.options.timeout)
            .with_cancellation(self.cancel.clone())
    }

    /// 発見フェーズ。成否にかかわらずセッションを切断する
    pub fn discover<S: Session + ?Sized>(&self, session: &mut S) -> Result<Discovery> {
        let waiter = self.waiter();
        let result = CallChainDiscoverer::new(&waiter).discover(
            session,
            &self.options.thread_name,
            &self.options.trigger,
        );
        if let Err(e) = session.dispose() {
            warn!("Failed to dispose discovery session: {}", e);
        }
        result
    }

    /// 再生フェーズ
    ///
    /// 失敗してもロガーを閉じるため、出力ファイルは常に完結した形で残ります。
    pub fn replay<S, L>(&self, discovery: Discovery, session: &mut S, logger: L) -> Result<WalkSummary>
    where
        S: Session + ?Sized,
        L: TraceLogger,
    {
        let budget = DepthBudget::new(self.options.max_depth);
        if !budget.is_unlimited() {
            debug!("Values deeper than {} are cut off", budget.max_depth());
        }
        let mut extractor = StackExtractor::new(logger, budget);
        let result = self.walk(discovery, session, &mut extractor);
        debug!("Expanded {} distinct reference(s)", extractor.visited_count());
        let finished = extractor.finish();

        if result.is_err() {
            if let Err(e) = session.dispose() {
                debug!("Failed to dispose replay session after error: {}", e);
            }
        }
        let summary = result?;
        finished?;
        Ok(summary)
    }

    fn walk<S, L>(
        &self,
        discovery: Discovery,
        session: &mut S,
        extractor: &mut StackExtractor<L>,
    ) -> Result<WalkSummary>
    where
        S: Session + ?Sized,
        L: TraceLogger,
    {
        let sequence = discovery.replay_sequence(self.options.replay_order);
        info!(
            "Replaying {} method(s) {} on thread '{}'",
            sequence.len(),
            self.options.replay_order,
            discovery.thread_name()
        );

        let thread = session.find_thread(discovery.thread_name())?;
        let waiter = self.waiter();
        let driver = StackWalkDriver::arm(
            session,
            extractor,
            &waiter,
            thread,
            discovery.thread_name(),
            BreakpointSequencer::new(sequence),
        )?;
        driver.run()
    }

    /// 発見と再生を続けて実行する
    pub fn run<A, B, L>(&self, discovery_session: &mut A, replay_session: &mut B, logger: L) -> Result<WalkSummary>
    where
        A: Session + ?Sized,
        B: Session + ?Sized,
        L: TraceLogger,
    {
        let discovery = match self.discover(discovery_session) {
            Ok(discovery) => discovery,
            Err(e) => {
                if let Err(err) = replay_session.dispose() {
                    warn!("Failed to dispose replay session: {}", err);
                }
                let mut logger = logger;
                if let Err(err) = logger.finish() {
                    warn!("Failed to finish trace output: {}", err);
                }
                return Err(e);
            }
        };
        self.replay(discovery, replay_session, logger)
    }
}
