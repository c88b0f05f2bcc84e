//! スタック走査ドライバ
//!
//! 再生用セッション（B）のスレッドを再開し、ブレークポイントで止まるたびに
//! すべてのフレームのスナップショットを取り、次のブレークポイントへ進めます。
//!
//! 状態遷移:
//! - `Armed` → 再開して停止を待つ → `Stopped`（停止）/ `Done`（終了）
//! - `Stopped` → 全フレームを抽出し、ヒットしたブレークポイントを解除 → `Armed` / `Done`
//! - `Done` → セッションを切断済み（終端）

use crate::extractor::StackExtractor;
use crate::sequencer::{ArmedBreakpoint, BreakpointSequencer};
use crate::snapshot::FrameSnapshot;
use crate::wait::{StopOutcome, StopWaiter};
use crate::Result;
use stacktwin_target::{MethodDescriptor, Session, ThreadId};
use stacktwin_trace::TraceLogger;
use std::fmt;
use tracing::info;

/// ドライバの状態
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriveState {
    /// ブレークポイント設定済み、未再開
    Armed(ArmedBreakpoint),
    /// ブレークポイントで停止中
    Stopped(ArmedBreakpoint),
    /// 完了
    Done,
}

/// 走査結果の要約
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalkSummary {
    /// 記録した停止の数
    pub stops: usize,
    /// 抽出したフレームの総数
    pub frames: usize,
    /// 設定できたブレークポイントの数
    pub breakpoints_installed: usize,
    /// 解決できずスキップした記述子
    pub skipped: Vec<MethodDescriptor>,
}

impl fmt::Display for WalkSummary {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} stop(s), {} frame(s), {} breakpoint(s) installed, {} skipped",
            self.stops,
            self.frames,
            self.breakpoints_installed,
            self.skipped.len()
        )
    }
}

/// スタック走査ドライバ
pub struct StackWalkDriver<'a, S: Session + ?Sized, L: TraceLogger> {
    session: &'a mut S,
    extractor: &'a mut StackExtractor<L>,
    waiter: &'a StopWaiter,
    thread: ThreadId,
    thread_name: String,
    sequencer: BreakpointSequencer,
    state: DriveState,
    stops: usize,
    frames: usize,
}

impl<'a, S: Session + ?Sized, L: TraceLogger> StackWalkDriver<'a, S, L> {
    /// 最初のブレークポイントを設定してドライバを作成する
    pub fn arm(
        session: &'a mut S,
        extractor: &'a mut StackExtractor<L>,
        waiter: &'a StopWaiter,
        thread: ThreadId,
        thread_name: impl Into<String>,
        sequencer: BreakpointSequencer,
    ) -> Result<Self> {
        let mut driver = Self {
            session,
            extractor,
            waiter,
            thread,
            thread_name: thread_name.into(),
            sequencer,
            state: DriveState::Done,
            stops: 0,
            frames: 0,
        };
        driver.arm_next()?;
        Ok(driver)
    }

    pub fn state(&self) -> &DriveState {
        &self.state
    }

    pub fn is_done(&self) -> bool {
        self.state == DriveState::Done
    }

    /// 状態を1つ進める
    pub fn step(&mut self) -> Result<&DriveState> {
        match std::mem::replace(&mut self.state, DriveState::Done) {
            DriveState::Armed(bp) => {
                self.session.resume(self.thread)?;
                match self.waiter.wait(&mut *self.session, self.thread, &self.thread_name)? {
                    StopOutcome::AtBreakpoint => self.state = DriveState::Stopped(bp),
                    StopOutcome::Terminated => {
                        info!("Thread '{}' terminated before reaching {}", self.thread_name, bp.method);
                        self.finish_session()?;
                    }
                }
            }
            DriveState::Stopped(bp) => {
                self.snapshot_stop(&bp)?;
                self.session.remove_breakpoint(bp.id)?;
                self.arm_next()?;
            }
            DriveState::Done => {}
        }
        Ok(&self.state)
    }

    /// 完了まで進めて要約を返す
    pub fn run(mut self) -> Result<WalkSummary> {
        while !self.is_done() {
            self.step()?;
        }
        Ok(self.summary())
    }

    pub fn summary(&self) -> WalkSummary {
        WalkSummary {
            stops: self.stops,
            frames: self.frames,
            breakpoints_installed: self.sequencer.installed(),
            skipped: self.sequencer.skipped().to_vec(),
        }
    }

    fn arm_next(&mut self) -> Result<()> {
        match self.sequencer.advance(&mut *self.session)? {
            Some(bp) => self.state = DriveState::Armed(bp),
            None => {
                info!("No more breakpoints to arm");
                self.finish_session()?;
            }
        }
        Ok(())
    }

    fn finish_session(&mut self) -> Result<()> {
        self.state = DriveState::Done;
        self.session.dispose()?;
        Ok(())
    }

    /// 停止中のスレッドの全フレームを内側から書き出す
    fn snapshot_stop(&mut self, bp: &ArmedBreakpoint) -> Result<()> {
        self.stops += 1;
        info!("Stop {} at {}", self.stops, bp.method);

        self.extractor
            .logger_mut()
            .stop_start(self.stops, &self.thread_name)?;
        for frame in self.session.frames(self.thread)? {
            let snapshot = FrameSnapshot::capture(&mut *self.session, &frame)?;
            snapshot.write_to(&mut *self.session, &mut *self.extractor)?;
            self.frames += 1;
        }
        self.extractor.logger_mut().stop_end()
    }
}
