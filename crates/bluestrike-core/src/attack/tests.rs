//! 攻击引擎测试
//!
//! 全部基于 SimulatedHost，时钟暂停以跳过发送间隔。

use super::*;
use crate::address::BdAddr;
use crate::error::BtError;
use crate::host::{ChannelKind, SimulatedHost};
use crate::progress::{ChannelSink, ProgressLevel, ProgressMessage};
use crate::session::Session;
use std::sync::Arc;
use tokio::sync::mpsc;

const TARGET: &str = "00:1A:7D:DA:71:13";

fn target() -> BdAddr {
    TARGET.parse().unwrap()
}

async fn ready_session(host: &SimulatedHost) -> Arc<Session> {
    let session = Arc::new(Session::new(Arc::new(host.clone())));
    session.init().await.unwrap();
    session
}

fn recorder() -> (Arc<ChannelSink>, mpsc::Receiver<ProgressMessage>) {
    let (sink, rx) = ChannelSink::new(1024);
    (Arc::new(sink), rx)
}

fn drain(rx: &mut mpsc::Receiver<ProgressMessage>) -> Vec<ProgressMessage> {
    let mut out = Vec::new();
    while let Ok(msg) = rx.try_recv() {
        out.push(msg);
    }
    out
}

fn count_level(messages: &[ProgressMessage], level: ProgressLevel) -> usize {
    messages.iter().filter(|m| m.level == level).count()
}

// ============================================================================
// AttackKind
// ============================================================================

#[test]
fn test_kind_ids_are_stable() {
    let ids: Vec<u8> = AttackKind::ALL.iter().map(|k| k.id()).collect();
    assert_eq!(ids, (1..=9).collect::<Vec<u8>>());
    assert_eq!(AttackKind::from_id(3), Some(AttackKind::Bluesmack));
    assert_eq!(AttackKind::from_id(0), None);
}

#[test]
fn test_kind_parsing() {
    assert_eq!("bluesmack".parse::<AttackKind>().unwrap(), AttackKind::Bluesmack);
    assert_eq!("SDP_OVERFLOW".parse::<AttackKind>().unwrap(), AttackKind::SdpOverflow);
    assert_eq!("1".parse::<AttackKind>().unwrap(), AttackKind::Blueborne);
    assert!("bluetooth".parse::<AttackKind>().is_err());
    for kind in AttackKind::ALL {
        assert_eq!(kind.slug().parse::<AttackKind>().unwrap(), kind);
    }
}

#[test]
fn test_from_kind_uses_defaults() {
    let defaults = crate::config::AttackDefaults::default();
    for kind in AttackKind::ALL {
        assert_eq!(Attack::from_kind(kind, &defaults).kind(), kind);
    }
    assert_eq!(
        Attack::from_kind(AttackKind::Bluesmack, &defaults),
        Attack::Bluesmack {
            packet_size: 600,
            count: 100
        }
    );
}

// ============================================================================
// BlueSmack
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_flood_sends_count_packets() {
    let host = SimulatedHost::new();
    let session = ready_session(&host).await;
    let (sink, mut rx) = recorder();

    let attack = Attack::Bluesmack {
        packet_size: 600,
        count: 25,
    };
    let outcome = session.execute(TARGET, &attack, sink).await.unwrap();

    assert_eq!(outcome.packets_sent, 25);
    assert_eq!(outcome.bytes_sent, 25 * 600);
    assert!(!outcome.cancelled);
    assert!(!outcome.send_failed);

    let sent = host.sent_packets();
    assert_eq!(sent.len(), 25);
    assert!(sent.iter().all(|p| p.len == 600
        && p.port == FLOOD_PSM
        && p.kind == ChannelKind::Packet
        && p.address == target()
        && p.first_byte == Some(b'A')));

    let messages = drain(&mut rx);
    let texts: Vec<&str> = messages.iter().map(|m| m.message.as_str()).collect();
    // 开始 + 第 1/11/21 个包 + 结束
    assert_eq!(
        texts,
        vec![
            "Starting BlueSmack attack",
            "Packet 1/25 sent (600 bytes)",
            "Packet 11/25 sent (600 bytes)",
            "Packet 21/25 sent (600 bytes)",
            "BlueSmack attack finished",
        ]
    );
    assert_eq!(count_level(&messages, ProgressLevel::Info), messages.len());
    assert_eq!(host.open_links(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_flood_zero_count() {
    let host = SimulatedHost::new();
    let session = ready_session(&host).await;
    let (sink, mut rx) = recorder();

    let attack = Attack::Bluesmack {
        packet_size: 600,
        count: 0,
    };
    let outcome = session.execute(TARGET, &attack, sink).await.unwrap();

    assert_eq!(outcome, AttackOutcome::default());
    assert!(host.sent_packets().is_empty());
    assert_eq!(host.connects(), vec![(target(), FLOOD_PSM)]);

    let messages = drain(&mut rx);
    assert_eq!(
        messages,
        vec![
            ProgressMessage::new(ProgressLevel::Info, "Starting BlueSmack attack"),
            ProgressMessage::new(ProgressLevel::Info, "BlueSmack attack finished"),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_flood_send_failure_still_succeeds() {
    let host = SimulatedHost::new().fail_send_after(3);
    let session = ready_session(&host).await;
    let (sink, mut rx) = recorder();

    let attack = Attack::Bluesmack {
        packet_size: 100,
        count: 50,
    };
    let outcome = session.execute(TARGET, &attack, sink).await.unwrap();

    assert_eq!(outcome.packets_sent, 3);
    assert!(outcome.send_failed);
    assert_eq!(host.sent_packets().len(), 3);

    let messages = drain(&mut rx);
    assert_eq!(count_level(&messages, ProgressLevel::Warning), 1);
    assert_eq!(count_level(&messages, ProgressLevel::Error), 0);
    assert_eq!(
        messages.last().unwrap().message,
        "BlueSmack attack finished"
    );
}

#[tokio::test(start_paused = true)]
async fn test_flood_invalid_address() {
    let host = SimulatedHost::new();
    let session = ready_session(&host).await;
    let (sink, mut rx) = recorder();

    let attack = Attack::Bluesmack {
        packet_size: 600,
        count: 10,
    };
    let err = session
        .execute("not-an-address", &attack, sink)
        .await
        .unwrap_err();
    assert_eq!(err.code(), -1);

    let messages = drain(&mut rx);
    assert_eq!(count_level(&messages, ProgressLevel::Error), 1);
    assert_eq!(messages.last().unwrap().message, "Invalid Bluetooth address");
    assert!(host.connects().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_flood_refused_connection() {
    let host = SimulatedHost::new().refuse(target());
    let session = ready_session(&host).await;
    let (sink, mut rx) = recorder();

    let attack = Attack::Bluesmack {
        packet_size: 600,
        count: 10,
    };
    let err = session.execute(TARGET, &attack, sink).await.unwrap_err();
    assert_eq!(err.code(), -1);

    let messages = drain(&mut rx);
    assert_eq!(count_level(&messages, ProgressLevel::Error), 1);
    assert!(host.sent_packets().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_stop_halts_flood() {
    let host = SimulatedHost::new();
    let session = ready_session(&host).await;
    let (sink, _rx) = recorder();

    let attack = Attack::Bluesmack {
        packet_size: 64,
        count: 1000,
    };
    let running = {
        let session = session.clone();
        tokio::spawn(async move { session.execute(TARGET, &attack, sink).await })
    };

    tokio::time::sleep(SEND_INTERVAL * 3 + SEND_INTERVAL / 2).await;
    session.stop();
    let sent_at_stop = host.sent_packets().len();

    let outcome = running.await.unwrap().unwrap();
    assert!(outcome.cancelled);
    assert!(outcome.packets_sent < 1000);
    assert_eq!(outcome.packets_sent as usize, sent_at_stop);
    assert_eq!(host.sent_packets().len(), sent_at_stop);
    assert_eq!(host.open_links(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_new_flood_clears_old_stop_request() {
    let host = SimulatedHost::new();
    let session = ready_session(&host).await;
    let (sink, _rx) = recorder();

    session.stop();
    let attack = Attack::Bluesmack {
        packet_size: 16,
        count: 4,
    };
    let outcome = session.execute(TARGET, &attack, sink).await.unwrap();
    assert_eq!(outcome.packets_sent, 4);
    assert!(!outcome.cancelled);
}

#[tokio::test(start_paused = true)]
async fn test_cleanup_mid_flood_stops_sending() {
    let host = SimulatedHost::new();
    let session = ready_session(&host).await;
    let (sink, mut rx) = recorder();

    let attack = Attack::Bluesmack {
        packet_size: 64,
        count: 100,
    };
    let running = {
        let session = session.clone();
        tokio::spawn(async move { session.execute(TARGET, &attack, sink).await })
    };

    tokio::time::sleep(SEND_INTERVAL * 2 + SEND_INTERVAL / 2).await;
    session.cleanup().await;
    let sent_at_cleanup = host.sent_packets().len();

    let outcome = running.await.unwrap().unwrap();
    assert!(outcome.send_failed);
    assert_eq!(host.sent_packets().len(), sent_at_cleanup);
    assert_eq!(host.open_handles(), 0);
    // cleanup 清除了当前接收器，之后的警告和结束消息不会送达
    assert_eq!(count_level(&drain(&mut rx), ProgressLevel::Warning), 0);
}

// ============================================================================
// BlueBorne
// ============================================================================

#[tokio::test]
async fn test_malformed_request_sent_once() {
    let host = SimulatedHost::new();
    let session = ready_session(&host).await;
    let (sink, mut rx) = recorder();

    let outcome = session
        .execute(TARGET, &Attack::Blueborne, sink)
        .await
        .unwrap();
    assert_eq!(outcome.packets_sent, 1);
    assert_eq!(outcome.bytes_sent, MALFORMED_PACKET_LEN as u64);

    let sent = host.sent_packets();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].port, SDP_PSM);
    assert_eq!(sent[0].len, MALFORMED_PACKET_LEN);

    let texts: Vec<String> = drain(&mut rx).into_iter().map(|m| m.message).collect();
    assert_eq!(
        texts,
        vec![
            "Starting BlueBorne attack",
            "Checking BlueBorne vulnerability...",
            "Attempting SDP exploitation...",
            "Malformed SDP packet sent",
            "Verifying attack effect...",
            "BlueBorne attack finished",
        ]
    );
    assert_eq!(host.open_links(), 0);
}

#[tokio::test]
async fn test_malformed_request_refused() {
    let host = SimulatedHost::new().refuse(target());
    let session = ready_session(&host).await;
    let (sink, mut rx) = recorder();

    let err = session
        .execute(TARGET, &Attack::Blueborne, sink)
        .await
        .unwrap_err();
    assert_eq!(err.code(), -1);

    let messages = drain(&mut rx);
    assert_eq!(count_level(&messages, ProgressLevel::Error), 1);
    assert!(
        messages
            .iter()
            .all(|m| m.message != "Malformed SDP packet sent")
    );
}

#[tokio::test]
async fn test_malformed_request_send_failure() {
    let host = SimulatedHost::new().fail_send_after(0);
    let session = ready_session(&host).await;
    let (sink, mut rx) = recorder();

    let err = session
        .execute(TARGET, &Attack::Blueborne, sink)
        .await
        .unwrap_err();
    assert_eq!(err.code(), -1);
    assert_eq!(host.open_links(), 0);

    let messages = drain(&mut rx);
    assert_eq!(count_level(&messages, ProgressLevel::Error), 1);
    assert!(
        messages
            .last()
            .unwrap()
            .message
            .starts_with("Failed to send malformed SDP packet")
    );
}

// ============================================================================
// 未实现的攻击 / 通用约定
// ============================================================================

#[tokio::test]
async fn test_unsupported_variants() {
    let host = SimulatedHost::new();
    let session = ready_session(&host).await;
    let defaults = crate::config::AttackDefaults::default();

    for kind in AttackKind::ALL.into_iter().filter(|k| !k.is_supported()) {
        let (sink, mut rx) = recorder();
        let attack = Attack::from_kind(kind, &defaults);
        let err = session.execute(TARGET, &attack, sink).await.unwrap_err();

        assert!(matches!(err, BtError::Unsupported(k) if k == kind));
        assert_eq!(err.code(), -5);
        assert_eq!(count_level(&drain(&mut rx), ProgressLevel::Error), 1);
    }
    assert!(host.connects().is_empty());
}

#[tokio::test]
async fn test_attack_requires_init() {
    let host = SimulatedHost::new();
    let session = Session::new(Arc::new(host.clone()));
    let (sink, mut rx) = recorder();

    let err = session
        .execute(TARGET, &Attack::Blueborne, sink)
        .await
        .unwrap_err();
    assert_eq!(err.code(), -1);
    assert_eq!(count_level(&drain(&mut rx), ProgressLevel::Error), 1);
    assert!(host.connects().is_empty());
}

#[tokio::test]
async fn test_blank_target_reports_invalid_address() {
    let host = SimulatedHost::new();
    let session = ready_session(&host).await;

    for text in ["", "   "] {
        let (sink, mut rx) = recorder();
        let err = session
            .execute(text, &Attack::Bluesmack { packet_size: 8, count: 1 }, sink)
            .await
            .unwrap_err();
        assert_eq!(err.code(), -1);

        let messages = drain(&mut rx);
        assert_eq!(messages[0].message, "Starting BlueSmack attack");
        assert_eq!(count_level(&messages, ProgressLevel::Error), 1);
        assert_eq!(messages.last().unwrap().message, "Invalid Bluetooth address");
    }
    assert!(host.connects().is_empty());
}

// ============================================================================
// 接收器与执行状态
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_sink_released_after_execute() {
    let host = SimulatedHost::new();
    let session = ready_session(&host).await;

    let (sink, mut rx) = recorder();
    session
        .execute(TARGET, &Attack::Bluesmack { packet_size: 8, count: 2 }, sink)
        .await
        .unwrap();
    let mut received = 0;
    while let Some(_msg) = rx.recv().await {
        received += 1;
    }
    assert!(received > 0);

    // 失败路径同样释放
    let (sink, mut rx) = recorder();
    session
        .execute("zz", &Attack::Blueborne, sink)
        .await
        .unwrap_err();
    let mut errors = 0;
    while let Some(msg) = rx.recv().await {
        if msg.level == ProgressLevel::Error {
            errors += 1;
        }
    }
    assert_eq!(errors, 1);
}

#[tokio::test(start_paused = true)]
async fn test_is_attacking_tracks_execution() {
    let host = SimulatedHost::new();
    let session = ready_session(&host).await;
    assert!(!session.is_attacking());

    let (sink, _rx) = recorder();
    let running = {
        let session = session.clone();
        tokio::spawn(async move {
            session
                .execute(TARGET, &Attack::Bluesmack { packet_size: 8, count: 50 }, sink)
                .await
        })
    };

    tokio::time::sleep(SEND_INTERVAL * 3).await;
    assert!(session.is_attacking());

    session.stop();
    running.await.unwrap().unwrap();
    assert!(!session.is_attacking());
}

#[tokio::test(start_paused = true)]
async fn test_context_reaches_terminated() {
    let host = SimulatedHost::new();
    let session = ready_session(&host).await;

    let attacks = [
        Attack::Blueborne,
        Attack::Bluesmack { packet_size: 8, count: 1 },
        Attack::Knob,
    ];
    for attack in &attacks {
        let ctx = AttackContext::new(&session, attack.kind());
        assert_eq!(ctx.kind(), attack.kind());
        assert_eq!(ctx.phase(), AttackPhase::NotStarted);

        let _ = run(&ctx, TARGET, attack).await;
        assert_eq!(ctx.phase(), AttackPhase::Terminated);
    }
}

#[tokio::test(start_paused = true)]
async fn test_execute_config_ignores_tuning_fields() {
    let host = SimulatedHost::new();
    let session = ready_session(&host).await;
    let (sink, _rx) = recorder();

    let defaults = crate::config::AttackDefaults {
        bluesmack_packet_count: 2,
        ..Default::default()
    };
    let mut config = AttackConfig::new(AttackKind::Bluesmack, TARGET);
    config.retries = 10;
    config.delay = std::time::Duration::from_secs(5);
    config.stealth_mode = true;

    let outcome = session
        .execute_config(&config, &defaults, sink)
        .await
        .unwrap();
    assert_eq!(outcome.packets_sent, 2);
    assert_eq!(host.connects().len(), 1);
}
