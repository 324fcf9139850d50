//! 错误类型与结果码

use crate::attack::AttackKind;
use crate::host::HostError;

/// 结果码，与外部调用方约定的整数值一致
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ResultCode {
    Success = 0,
    Error = -1,
    Timeout = -2,
    NotFound = -3,
    PermissionDenied = -4,
    Unsupported = -5,
}

impl ResultCode {
    pub fn code(self) -> i32 {
        self as i32
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::Success),
            -1 => Some(Self::Error),
            -2 => Some(Self::Timeout),
            -3 => Some(Self::NotFound),
            -4 => Some(Self::PermissionDenied),
            -5 => Some(Self::Unsupported),
            _ => None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BtError {
    #[error("General error: {0}")]
    General(String),

    #[error("Operation timed out")]
    Timeout,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Unsupported operation: {0} has no phase sequence")]
    Unsupported(AttackKind),
}

impl BtError {
    pub fn general(msg: impl Into<String>) -> Self {
        BtError::General(msg.into())
    }

    pub fn result_code(&self) -> ResultCode {
        match self {
            BtError::General(_) => ResultCode::Error,
            BtError::Timeout => ResultCode::Timeout,
            BtError::NotFound(_) => ResultCode::NotFound,
            BtError::PermissionDenied(_) => ResultCode::PermissionDenied,
            BtError::Unsupported(_) => ResultCode::Unsupported,
        }
    }

    /// 整数结果码
    pub fn code(&self) -> i32 {
        self.result_code().code()
    }
}

impl From<HostError> for BtError {
    fn from(err: HostError) -> Self {
        match err {
            HostError::Timeout => BtError::Timeout,
            HostError::PermissionDenied(msg) => BtError::PermissionDenied(msg),
            HostError::NotFound(msg) => BtError::NotFound(msg),
            other => BtError::General(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, BtError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        assert_eq!(BtError::general("x").code(), -1);
        assert_eq!(BtError::Timeout.code(), -2);
        assert_eq!(BtError::NotFound("x".into()).code(), -3);
        assert_eq!(BtError::PermissionDenied("x".into()).code(), -4);
        assert_eq!(BtError::Unsupported(AttackKind::Knob).code(), -5);
    }

    #[test]
    fn test_host_error_classes_survive() {
        assert!(matches!(BtError::from(HostError::Timeout), BtError::Timeout));
        assert!(matches!(
            BtError::from(HostError::PermissionDenied("hci0".into())),
            BtError::PermissionDenied(_)
        ));
        assert!(matches!(
            BtError::from(HostError::Refused("psm 1".into())),
            BtError::General(_)
        ));
    }

    #[test]
    fn test_result_code_lookup() {
        for code in [0, -1, -2, -3, -4, -5] {
            assert_eq!(ResultCode::from_code(code).unwrap().code(), code);
        }
        assert!(ResultCode::from_code(7).is_none());
    }
}
