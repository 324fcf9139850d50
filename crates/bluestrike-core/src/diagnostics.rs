//! 内部诊断日志与错误码描述
//!
//! 诊断日志与攻击进度汇报相互独立，消息不会进入 [`ProgressSink`](crate::ProgressSink)。

use crate::error::ResultCode;
use std::fmt;
use std::sync::atomic::{AtomicI32, Ordering};

/// 按阈值门控的调试输出
///
/// 级别 `L` 的消息仅在 `L <= threshold` 时输出，默认阈值为 0。
#[derive(Debug, Default)]
pub struct Diagnostics {
    threshold: AtomicI32,
}

impl Diagnostics {
    pub fn new(threshold: i32) -> Self {
        Self {
            threshold: AtomicI32::new(threshold),
        }
    }

    pub fn set_debug_level(&self, level: i32) {
        self.threshold.store(level, Ordering::Relaxed);
    }

    pub fn debug_level(&self) -> i32 {
        self.threshold.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn enabled(&self, level: i32) -> bool {
        level <= self.debug_level()
    }

    /// 输出一条诊断消息，返回是否实际输出
    pub fn debug(&self, level: i32, args: fmt::Arguments<'_>) -> bool {
        if !self.enabled(level) {
            return false;
        }
        log::debug!(target: "bluestrike_core::diagnostics", "[{level}] {args}");
        true
    }
}

/// 错误码描述，对任意整数都有返回值
pub fn error_string(code: i32) -> &'static str {
    match ResultCode::from_code(code) {
        Some(ResultCode::Success) => "Success",
        Some(ResultCode::Error) => "General error",
        Some(ResultCode::Timeout) => "Timeout",
        Some(ResultCode::NotFound) => "Not found",
        Some(ResultCode::PermissionDenied) => "Permission denied",
        Some(ResultCode::Unsupported) => "Unsupported operation",
        None => "Unknown error",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_gating() {
        let diag = Diagnostics::default();
        assert!(diag.debug(0, format_args!("always")));
        assert!(!diag.debug(1, format_args!("hidden")));

        diag.set_debug_level(2);
        assert!(diag.debug(1, format_args!("shown")));
        assert!(diag.debug(2, format_args!("shown")));
        assert!(!diag.debug(3, format_args!("hidden")));
    }

    #[test]
    fn test_initial_threshold() {
        let diag = Diagnostics::new(3);
        assert_eq!(diag.debug_level(), 3);
        assert!(diag.enabled(3));
        assert!(!diag.enabled(4));
    }

    #[test]
    fn test_error_string_is_total() {
        for code in [0, -1, -2, -3, -4, -5] {
            assert!(!error_string(code).is_empty());
            assert_ne!(error_string(code), "Unknown error");
        }
        for code in [1, -6, 42, i32::MIN, i32::MAX] {
            assert_eq!(error_string(code), "Unknown error");
        }
    }
}
