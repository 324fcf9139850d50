//! 设备扫描
//!
//! 通过传输管理器的控制通道发起 inquiry 并读取远端名称。
//!
//! # 与单地址查询的差异
//!
//! - `scan` 的结果带 RSSI（来自 inquiry）
//! - `device_info` 不发起 inquiry，RSSI 为 `None`

use crate::address::BdAddr;
use crate::error::Result;
use crate::host::{MAX_NAME_LEN, truncate_name};
use crate::transport::TransportManager;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 名称读取失败时使用的占位名称
pub const UNKNOWN_NAME: &str = "[unknown]";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub address: BdAddr,
    pub name: String,
    pub rssi: Option<i16>,
    /// 以下三个标志由外部组件填充，扫描结果中总为 false
    pub paired: bool,
    pub trusted: bool,
    pub connected: bool,
}

impl Device {
    fn new(address: BdAddr, name: String, rssi: Option<i16>) -> Self {
        Self {
            address,
            name,
            rssi,
            paired: false,
            trusted: false,
            connected: false,
        }
    }
}

/// 扫描附近设备，结果不超过 `max_devices` 条
pub async fn scan(
    transport: &TransportManager,
    max_devices: usize,
    timeout: Duration,
) -> Result<Vec<Device>> {
    let handles = transport.acquire().await?;

    let responses = handles
        .control
        .inquiry(max_devices, timeout, true)
        .await?;
    debug!(
        "Inquiry returned {} response(s), keeping at most {}",
        responses.len(),
        max_devices
    );

    let mut devices = Vec::with_capacity(responses.len().min(max_devices));
    for response in responses.into_iter().take(max_devices) {
        let name = match handles
            .control
            .read_remote_name(response.address, MAX_NAME_LEN)
            .await
        {
            Ok(name) => truncate_name(name, MAX_NAME_LEN),
            Err(e) => {
                debug!("Name resolution for {} failed: {}", response.address, e);
                UNKNOWN_NAME.to_string()
            }
        };
        devices.push(Device::new(response.address, name, Some(response.rssi)));
    }

    info!("Scan complete: {} device(s)", devices.len());
    Ok(devices)
}

/// 查询单个已知地址的名称
pub async fn device_info(transport: &TransportManager, address: &str) -> Result<Device> {
    let address = BdAddr::parse(address)?;
    let handles = transport.acquire().await?;

    let name = match handles.control.read_remote_name(address, MAX_NAME_LEN).await {
        Ok(name) => truncate_name(name, MAX_NAME_LEN),
        Err(e) => {
            debug!("Name resolution for {} failed: {}", address, e);
            UNKNOWN_NAME.to_string()
        }
    };

    Ok(Device::new(address, name, None))
}
