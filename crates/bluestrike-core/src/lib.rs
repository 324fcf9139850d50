//! Bluestrike Core Library
//!
//! 蓝牙渗透测试引擎：发现附近设备，对指定目标执行协议层故障注入和洪泛攻击，
//! 并实时汇报分级进度，支持协作式取消。
//!
//! # 模块
//!
//! - **address**: 蓝牙地址文本/二进制转换
//! - **host**: 主机协议栈接口（BlueZ 实现与内存模拟实现）
//! - **transport**: 传输句柄生命周期与串行化访问
//! - **scanner**: 设备发现与单地址查询
//! - **attack**: 攻击目录与执行引擎
//! - **progress**: 分级进度消息与接收器
//! - **diagnostics**: 诊断日志门控与错误码描述
//! - **config**: 设置持久化
//!
//! # 使用示例
//!
//! ```ignore
//! use bluestrike_core::{Attack, BluezHost, ChannelSink, Session};
//!
//! let session = Arc::new(Session::new(Arc::new(BluezHost::new(None))));
//! session.init().await?;
//!
//! // 1. 扫描附近设备
//! let devices = session.scan(10, Duration::from_secs(8)).await?;
//!
//! // 2. 对目标执行攻击，进度通过 channel 接收
//! let (sink, mut rx) = ChannelSink::new(64);
//! let attack = Attack::Bluesmack { packet_size: 600, count: 100 };
//! let outcome = session.execute("AA:BB:CC:DD:EE:FF", &attack, Arc::new(sink)).await?;
//!
//! // 3. 释放传输句柄
//! session.cleanup().await;
//! ```

pub mod address;
pub mod attack;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod host;
pub mod progress;
pub mod scanner;
pub mod session;
pub mod transport;

pub use address::{BdAddr, format_address, parse_address};
pub use attack::{Attack, AttackConfig, AttackKind, AttackOutcome, AttackPhase};
pub use config::{AttackDefaults, Settings};
pub use diagnostics::{Diagnostics, error_string};
pub use error::{BtError, ResultCode};
pub use host::{BluezHost, HostStack, SimulatedHost};
pub use progress::{ChannelSink, FanOut, FnSink, ProgressLevel, ProgressMessage, ProgressSink};
pub use scanner::{Device, UNKNOWN_NAME};
pub use session::Session;
