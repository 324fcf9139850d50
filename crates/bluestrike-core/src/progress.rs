//! 攻击进度汇报
//!
//! 提供跨 UI 的统一进度级别、消息条目和进度接收器。

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;

/// 进度级别
///
/// 整数值与外部回调约定一致: 1=info, 2=warning, 3=error。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ProgressLevel {
    Info = 1,
    Warning = 2,
    Error = 3,
}

impl ProgressLevel {
    pub fn code(self) -> i32 {
        self as i32
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(ProgressLevel::Info),
            2 => Some(ProgressLevel::Warning),
            3 => Some(ProgressLevel::Error),
            _ => None,
        }
    }

    /// 获取对应的 Emoji 图标
    pub fn icon(&self) -> &'static str {
        match self {
            ProgressLevel::Info => "ℹ️",
            ProgressLevel::Warning => "⚠️",
            ProgressLevel::Error => "❌",
        }
    }

    /// 获取显示名称
    pub fn name(&self) -> &'static str {
        match self {
            ProgressLevel::Info => "INFO",
            ProgressLevel::Warning => "WARN",
            ProgressLevel::Error => "ERROR",
        }
    }
}

impl std::str::FromStr for ProgressLevel {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "INFO" | "1" => Ok(ProgressLevel::Info),
            "WARN" | "WARNING" | "2" => Ok(ProgressLevel::Warning),
            "ERROR" | "3" => Ok(ProgressLevel::Error),
            _ => Err(()),
        }
    }
}

impl fmt::Display for ProgressLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// 一条进度消息，只在内存中传递
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressMessage {
    pub level: ProgressLevel,
    pub message: String,
}

impl ProgressMessage {
    pub fn new(level: ProgressLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }
}

/// 进度接收器
///
/// 在调用方任务上同步调用，实现不应长时间阻塞。
pub trait ProgressSink: Send + Sync {
    fn report(&self, message: &str, level: ProgressLevel);
}

/// 基于 mpsc 的接收器，满了就丢弃
pub struct ChannelSink {
    tx: mpsc::Sender<ProgressMessage>,
}

impl ChannelSink {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<ProgressMessage>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }
}

impl ProgressSink for ChannelSink {
    fn report(&self, message: &str, level: ProgressLevel) {
        let _ = self.tx.try_send(ProgressMessage::new(level, message));
    }
}

/// 闭包适配器
pub struct FnSink<F>(pub F);

impl<F> ProgressSink for FnSink<F>
where
    F: Fn(&str, ProgressLevel) + Send + Sync,
{
    fn report(&self, message: &str, level: ProgressLevel) {
        (self.0)(message, level);
    }
}

/// 同时转发给多个接收器
#[derive(Default)]
pub struct FanOut {
    sinks: Vec<Arc<dyn ProgressSink>>,
}

impl FanOut {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.sinks.push(sink);
        self
    }
}

impl ProgressSink for FanOut {
    fn report(&self, message: &str, level: ProgressLevel) {
        for sink in &self.sinks {
            sink.report(message, level);
        }
    }
}
