//! 蓝牙地址编解码
//!
//! 文本形式为 6 组冒号分隔的十六进制字节（`AA:BB:CC:DD:EE:FF`），
//! 二进制形式为 6 字节，按书写顺序存放（与 `bluer::Address` 一致）。

use crate::error::BtError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 规范文本长度: 6 * 2 个十六进制字符 + 5 个冒号
pub const ADDRESS_TEXT_LEN: usize = 17;

/// 6 字节蓝牙设备地址
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct BdAddr(pub [u8; 6]);

impl BdAddr {
    pub const fn new(bytes: [u8; 6]) -> Self {
        Self(bytes)
    }

    /// 解析文本地址，接受大小写十六进制
    pub fn parse(text: &str) -> Result<Self, BtError> {
        let mut bytes = [0u8; 6];
        let mut tokens = text.split(':');

        for slot in &mut bytes {
            let token = tokens
                .next()
                .ok_or_else(|| BtError::general(format!("address '{text}' has too few octets")))?;
            if token.len() != 2 || !token.bytes().all(|b| b.is_ascii_hexdigit()) {
                return Err(BtError::general(format!(
                    "address '{text}' has invalid octet '{token}'"
                )));
            }
            *slot = u8::from_str_radix(token, 16)
                .map_err(|e| BtError::general(format!("address '{text}': {e}")))?;
        }

        if tokens.next().is_some() {
            return Err(BtError::general(format!(
                "address '{text}' has too many octets"
            )));
        }

        Ok(Self(bytes))
    }

    /// 规范文本形式（大写）
    pub fn format(&self) -> String {
        self.to_string()
    }

    pub fn octets(&self) -> [u8; 6] {
        self.0
    }
}

impl fmt::Display for BdAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02X}:{b:02X}:{c:02X}:{d:02X}:{e:02X}:{g:02X}")
    }
}

impl FromStr for BdAddr {
    type Err = BtError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<bluer::Address> for BdAddr {
    fn from(addr: bluer::Address) -> Self {
        Self(addr.0)
    }
}

impl From<BdAddr> for bluer::Address {
    fn from(addr: BdAddr) -> Self {
        bluer::Address::new(addr.0)
    }
}

impl Serialize for BdAddr {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for BdAddr {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::parse(&text).map_err(serde::de::Error::custom)
    }
}

/// 对外的字节接口：解析为 6 字节
pub fn parse_address(text: &str) -> Result<[u8; 6], BtError> {
    BdAddr::parse(text).map(|a| a.0)
}

/// 对外的字节接口：6 字节格式化为规范文本
///
/// 长度不为 6 的输入视为缺失地址。
pub fn format_address(bytes: &[u8]) -> Result<String, BtError> {
    let octets: [u8; 6] = bytes
        .try_into()
        .map_err(|_| BtError::general(format!("expected 6 address bytes, got {}", bytes.len())))?;
    Ok(BdAddr(octets).format())
}
