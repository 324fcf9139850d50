//! 终端输出

use bluestrike_core::{Device, ProgressLevel, ProgressSink};

/// 把进度消息打印到终端
pub struct ConsoleSink;

impl ProgressSink for ConsoleSink {
    fn report(&self, message: &str, level: ProgressLevel) {
        match level {
            ProgressLevel::Info => println!("{} {}", level.icon(), message),
            ProgressLevel::Warning | ProgressLevel::Error => {
                eprintln!("{} [{}] {}", level.icon(), level, message);
            }
        }
    }
}

pub fn print_device(index: usize, device: &Device) {
    match device.rssi {
        Some(rssi) => println!(
            "   [{}] {} ({}) {} dBm",
            index, device.name, device.address, rssi
        ),
        None => println!("   [{}] {} ({})", index, device.name, device.address),
    }
}
