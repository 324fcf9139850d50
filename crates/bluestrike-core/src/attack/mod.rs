//! 攻击引擎
//!
//! 每种攻击都是一个阶段序列：
//!
//! `NotStarted → Resolving → Connecting → Transmitting → Completing → Terminated`
//!
//! 阶段之间不重试。进度通过会话的当前接收器汇报，取消只在循环攻击的
//! 每次迭代开始时检查。
//!
//! 已实现的阶段序列：
//! - **BlueSmack**: L2CAP 大包洪泛
//! - **BlueBorne**: 单个畸形 SDP 请求
//!
//! 其余类型返回 [`BtError::Unsupported`]。

mod blueborne;
mod bluesmack;
mod context;

#[cfg(test)]
mod tests;

pub use blueborne::{MALFORMED_PACKET_LEN, SDP_PSM};
pub use bluesmack::{FLOOD_PSM, PROGRESS_EVERY, SEND_INTERVAL};
pub use context::AttackContext;

use crate::config::AttackDefaults;
use crate::error::{BtError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// 攻击类型，id 与外部接口保持一致
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AttackKind {
    Blueborne = 1,
    Knob = 2,
    Bluesmack = 3,
    Bluesnarf = 4,
    Bluejacking = 5,
    L2capInjection = 6,
    SdpOverflow = 7,
    PinCracking = 8,
    Bluebug = 9,
}

impl AttackKind {
    pub const ALL: [AttackKind; 9] = [
        AttackKind::Blueborne,
        AttackKind::Knob,
        AttackKind::Bluesmack,
        AttackKind::Bluesnarf,
        AttackKind::Bluejacking,
        AttackKind::L2capInjection,
        AttackKind::SdpOverflow,
        AttackKind::PinCracking,
        AttackKind::Bluebug,
    ];

    pub fn id(self) -> u8 {
        self as u8
    }

    pub fn from_id(id: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.id() == id)
    }

    /// 命令行使用的名称
    pub fn slug(self) -> &'static str {
        match self {
            AttackKind::Blueborne => "blueborne",
            AttackKind::Knob => "knob",
            AttackKind::Bluesmack => "bluesmack",
            AttackKind::Bluesnarf => "bluesnarf",
            AttackKind::Bluejacking => "bluejacking",
            AttackKind::L2capInjection => "l2cap-injection",
            AttackKind::SdpOverflow => "sdp-overflow",
            AttackKind::PinCracking => "pin-cracking",
            AttackKind::Bluebug => "bluebug",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            AttackKind::Blueborne => "BlueBorne",
            AttackKind::Knob => "KNOB",
            AttackKind::Bluesmack => "BlueSmack",
            AttackKind::Bluesnarf => "BlueSnarf",
            AttackKind::Bluejacking => "BlueJacking",
            AttackKind::L2capInjection => "L2CAP injection",
            AttackKind::SdpOverflow => "SDP overflow",
            AttackKind::PinCracking => "PIN cracking",
            AttackKind::Bluebug => "BlueBug",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            AttackKind::Blueborne => "Single malformed request against the SDP responder",
            AttackKind::Knob => "Legacy key-negotiation downgrade",
            AttackKind::Bluesmack => "Oversized L2CAP packet flood",
            AttackKind::Bluesnarf => "Unauthorized data exfiltration",
            AttackKind::Bluejacking => "Unsolicited message to a discoverable peer",
            AttackKind::L2capInjection => "Arbitrary L2CAP channel injection",
            AttackKind::SdpOverflow => "Size-driven overflow against the SDP responder",
            AttackKind::PinCracking => "Passcode brute force",
            AttackKind::Bluebug => "Remote AT command channel abuse",
        }
    }

    /// 是否有可执行的阶段序列
    pub fn is_supported(self) -> bool {
        matches!(self, AttackKind::Blueborne | AttackKind::Bluesmack)
    }
}

impl fmt::Display for AttackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AttackKind {
    type Err = BtError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase().replace('_', "-");
        if let Ok(id) = wanted.parse::<u8>() {
            return Self::from_id(id)
                .ok_or_else(|| BtError::general(format!("unknown attack id {id}")));
        }
        Self::ALL
            .into_iter()
            .find(|k| k.slug() == wanted || k.name().to_lowercase() == wanted)
            .ok_or_else(|| BtError::general(format!("unknown attack '{s}'")))
    }
}

/// 攻击及其参数
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attack {
    Blueborne,
    Knob,
    Bluesmack { packet_size: u16, count: u32 },
    Bluesnarf,
    Bluejacking { message: String },
    L2capInjection { channel: u16, payload: Vec<u8> },
    SdpOverflow { size: u16 },
    PinCracking { min_length: u8, max_length: u8 },
    Bluebug { commands: Vec<String> },
}

impl Attack {
    pub fn kind(&self) -> AttackKind {
        match self {
            Attack::Blueborne => AttackKind::Blueborne,
            Attack::Knob => AttackKind::Knob,
            Attack::Bluesmack { .. } => AttackKind::Bluesmack,
            Attack::Bluesnarf => AttackKind::Bluesnarf,
            Attack::Bluejacking { .. } => AttackKind::Bluejacking,
            Attack::L2capInjection { .. } => AttackKind::L2capInjection,
            Attack::SdpOverflow { .. } => AttackKind::SdpOverflow,
            Attack::PinCracking { .. } => AttackKind::PinCracking,
            Attack::Bluebug { .. } => AttackKind::Bluebug,
        }
    }

    /// 用默认参数构造
    pub fn from_kind(kind: AttackKind, defaults: &AttackDefaults) -> Self {
        match kind {
            AttackKind::Blueborne => Attack::Blueborne,
            AttackKind::Knob => Attack::Knob,
            AttackKind::Bluesmack => Attack::Bluesmack {
                packet_size: defaults.bluesmack_packet_size,
                count: defaults.bluesmack_packet_count,
            },
            AttackKind::Bluesnarf => Attack::Bluesnarf,
            AttackKind::Bluejacking => Attack::Bluejacking {
                message: defaults.bluejacking_message.clone(),
            },
            AttackKind::L2capInjection => Attack::L2capInjection {
                channel: defaults.l2cap_channel,
                payload: defaults.l2cap_payload.as_bytes().to_vec(),
            },
            AttackKind::SdpOverflow => Attack::SdpOverflow {
                size: defaults.sdp_overflow_size,
            },
            AttackKind::PinCracking => Attack::PinCracking {
                min_length: defaults.pin_min_length,
                max_length: defaults.pin_max_length,
            },
            AttackKind::Bluebug => Attack::Bluebug {
                commands: defaults.bluebug_commands.clone(),
            },
        }
    }
}

/// 攻击配置
///
/// 执行时只读取 `kind` 和 `target_address`，其余字段保留在接口中但不参与执行。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttackConfig {
    pub kind: AttackKind,
    pub target_address: String,
    pub timeout: Duration,
    pub retries: u32,
    pub delay: Duration,
    pub stealth_mode: bool,
    pub verbose: bool,
}

impl AttackConfig {
    pub fn new(kind: AttackKind, target_address: impl Into<String>) -> Self {
        Self {
            kind,
            target_address: target_address.into(),
            timeout: Duration::from_secs(60),
            retries: 3,
            delay: Duration::ZERO,
            stealth_mode: false,
            verbose: false,
        }
    }
}

/// 攻击阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttackPhase {
    NotStarted,
    Resolving,
    Connecting,
    Transmitting,
    Completing,
    Terminated,
}

/// 成功结束时的统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AttackOutcome {
    pub packets_sent: u32,
    pub bytes_sent: u64,
    /// 因停止请求提前结束
    pub cancelled: bool,
    /// 中途发送失败，仍按成功返回
    pub send_failed: bool,
}

pub(crate) async fn run(
    ctx: &AttackContext<'_>,
    target: &str,
    attack: &Attack,
) -> Result<AttackOutcome> {
    let result = match attack {
        Attack::Bluesmack { packet_size, count } => {
            bluesmack::run(ctx, target, *packet_size, *count).await
        }
        Attack::Blueborne => blueborne::run(ctx, target).await,
        other => {
            let kind = other.kind();
            ctx.error(&format!("{kind} attack is not supported"));
            Err(BtError::Unsupported(kind))
        }
    };
    ctx.enter(AttackPhase::Terminated);
    result
}
