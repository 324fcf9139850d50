//! 应用配置和持久化
//!
//! 提供适配器、扫描参数和各攻击默认参数的存储和读取。

use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// 扫描相关设置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BluetoothSettings {
    /// HCI 适配器名称
    pub interface: String,
    /// 扫描超时（秒）
    pub scan_timeout: u64,
    /// 单次扫描最多返回的设备数
    pub max_devices: usize,
}

impl Default for BluetoothSettings {
    fn default() -> Self {
        Self {
            interface: "hci0".to_string(),
            scan_timeout: 30,
            max_devices: 100,
        }
    }
}

impl BluetoothSettings {
    pub fn scan_timeout(&self) -> Duration {
        Duration::from_secs(self.scan_timeout)
    }
}

/// 各攻击的默认参数
///
/// 通过 [`AttackConfig`](crate::AttackConfig) 发起攻击时，
/// 配置里只有类型和目标，其余参数从这里取。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttackDefaults {
    pub bluesmack_packet_size: u16,
    pub bluesmack_packet_count: u32,
    pub bluejacking_message: String,
    pub l2cap_channel: u16,
    pub l2cap_payload: String,
    pub sdp_overflow_size: u16,
    pub pin_min_length: u8,
    pub pin_max_length: u8,
    pub bluebug_commands: Vec<String>,
}

impl Default for AttackDefaults {
    fn default() -> Self {
        Self {
            bluesmack_packet_size: 600,
            bluesmack_packet_count: 100,
            bluejacking_message: "Test BlueJacking".to_string(),
            l2cap_channel: 1,
            l2cap_payload: "A".repeat(100),
            sdp_overflow_size: 2048,
            pin_min_length: 4,
            pin_max_length: 8,
            bluebug_commands: vec![
                "AT+CGMI".to_string(),
                "AT+CGMM".to_string(),
                "AT+CGSN".to_string(),
            ],
        }
    }
}

/// 应用设置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub bluetooth: BluetoothSettings,
    /// 诊断日志阈值
    pub debug_level: i32,
    pub attacks: AttackDefaults,
}

impl Settings {
    /// 获取配置文件路径
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("bluestrike")
            .join("settings.toml")
    }

    /// 加载设置（如果文件不存在则使用默认值）
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> Self {
        if path.exists() {
            match fs::read_to_string(path) {
                Ok(content) => match toml::from_str(&content) {
                    Ok(settings) => {
                        debug!("Loaded settings from {:?}", path);
                        return settings;
                    }
                    Err(e) => {
                        log::warn!("Failed to parse settings: {}, using defaults", e);
                    }
                },
                Err(e) => {
                    log::warn!("Failed to read settings file: {}, using defaults", e);
                }
            }
        }
        Self::default()
    }

    /// 保存设置
    pub fn save(&self) -> anyhow::Result<()> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        debug!("Saved settings to {:?}", path);
        Ok(())
    }
}
