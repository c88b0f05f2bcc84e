//! 1フレーム分のスナップショット

use crate::extractor::StackExtractor;
use crate::Result;
use stacktwin_target::{FrameHandle, MethodDescriptor, RuntimeValue, Session, SessionError};
use stacktwin_trace::TraceLogger;
use tracing::{debug, warn};

/// 読み取れた値、または読み取れなかった理由
#[derive(Debug, Clone, PartialEq)]
pub enum Readout<T> {
    Available(T),
    Inaccessible(String),
}

impl<T> Readout<T> {
    /// `Inaccessible` だけを回復可能として扱う
    fn from_result(result: stacktwin_target::Result<T>) -> Result<Self> {
        match result {
            Ok(value) => Ok(Readout::Available(value)),
            Err(SessionError::Inaccessible(reason)) => Ok(Readout::Inaccessible(reason)),
            Err(e) => Err(e.into()),
        }
    }
}

/// 停止時点でのフレームの観測結果
#[derive(Debug, Clone, PartialEq)]
pub struct FrameSnapshot {
    /// フレーム番号（0 が最も内側）
    pub index: usize,
    pub method: MethodDescriptor,
    /// 宣言順の引数
    pub arguments: Readout<Vec<RuntimeValue>>,
    /// レシーバ（static メソッドでは `Null`）
    pub receiver: Readout<RuntimeValue>,
}

impl FrameSnapshot {
    /// フレームのメソッド・引数・レシーバを読み取る
    pub fn capture<S: Session + ?Sized>(session: &mut S, frame: &FrameHandle) -> Result<Self> {
        let method = session.frame_method(frame)?;
        let arguments = Readout::from_result(session.arguments(frame))?;
        let receiver = Readout::from_result(session.receiver(frame))?;

        if let (Readout::Available(values), Some(params)) = (&arguments, &method.parameter_types) {
            if values.len() != params.len() {
                warn!(
                    "{} declares {} parameter(s) but the frame reported {} value(s)",
                    method,
                    params.len(),
                    values.len()
                );
            }
        }

        Ok(Self {
            index: frame.index,
            method,
            arguments,
            receiver,
        })
    }

    /// 抽出器を通してロガーに書き出す
    pub fn write_to<S, L>(&self, session: &mut S, extractor: &mut StackExtractor<L>) -> Result<()>
    where
        S: Session + ?Sized,
        L: TraceLogger,
    {
        extractor.logger_mut().frame_start(self.index)?;
        extractor.logger_mut().method_signature(&self.method)?;

        extractor.logger_mut().arguments_start()?;
        match &self.arguments {
            Readout::Available(values) => {
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        extractor.logger_mut().separator()?;
                    }
                    extractor.extract(session, *value, 0)?;
                }
            }
            Readout::Inaccessible(reason) => {
                debug!("Arguments of {} are inaccessible: {}", self.method, reason);
                extractor.logger_mut().arguments_inaccessible()?;
            }
        }
        extractor.logger_mut().arguments_end()?;

        extractor.logger_mut().receiver_start()?;
        match &self.receiver {
            Readout::Available(value) => extractor.extract(session, *value, 0)?,
            Readout::Inaccessible(reason) => {
                debug!("Receiver of {} is inaccessible: {}", self.method, reason);
                extractor.logger_mut().receiver_inaccessible()?;
            }
        }
        extractor.logger_mut().receiver_end()?;

        extractor.logger_mut().frame_end()
    }
}
