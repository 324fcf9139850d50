//! 会话上下文
//!
//! 一个 [`Session`] 持有传输管理器、取消标志、当前进度接收器和诊断门控，
//! 所有操作都通过它进行。不同会话之间互不影响，可以并发攻击不同目标。

use crate::attack::{self, Attack, AttackConfig, AttackContext, AttackOutcome};
use crate::config::AttackDefaults;
use crate::diagnostics::Diagnostics;
use crate::error::Result;
use crate::host::HostStack;
use crate::progress::{ProgressLevel, ProgressSink};
use crate::scanner::{self, Device};
use crate::transport::TransportManager;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

pub struct Session {
    transport: TransportManager,
    cancel: AtomicBool,
    attacking: AtomicBool,
    active_sink: Mutex<Option<Arc<dyn ProgressSink>>>,
    diagnostics: Diagnostics,
}

impl Session {
    pub fn new(host: Arc<dyn HostStack>) -> Self {
        Self {
            transport: TransportManager::new(host),
            cancel: AtomicBool::new(false),
            attacking: AtomicBool::new(false),
            active_sink: Mutex::new(None),
            diagnostics: Diagnostics::default(),
        }
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn transport(&self) -> &TransportManager {
        &self.transport
    }

    pub async fn init(&self) -> Result<()> {
        self.transport.init(&self.diagnostics).await
    }

    /// 释放句柄并清除取消标志和当前接收器，总是成功
    pub async fn cleanup(&self) {
        if self.transport.cleanup().await {
            self.diagnostics
                .debug(1, format_args!("Bluetooth transport released"));
        }
        self.cancel.store(false, Ordering::SeqCst);
        self.set_active_sink(None);
    }

    pub async fn is_initialized(&self) -> bool {
        self.transport.is_open().await
    }

    pub async fn scan(&self, max_devices: usize, timeout: Duration) -> Result<Vec<Device>> {
        scanner::scan(&self.transport, max_devices, timeout).await
    }

    pub async fn device_info(&self, address: &str) -> Result<Device> {
        scanner::device_info(&self.transport, address).await
    }

    /// 请求停止当前攻击
    ///
    /// 只在循环型攻击的每次迭代开始时生效，不会关闭任何通道。
    pub fn stop(&self) {
        self.cancel.store(true, Ordering::SeqCst);
        self.diagnostics
            .debug(1, format_args!("Attack stop requested"));
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    /// 是否有攻击正在执行
    pub fn is_attacking(&self) -> bool {
        self.attacking.load(Ordering::SeqCst)
    }

    pub(crate) fn reset_cancel(&self) {
        self.cancel.store(false, Ordering::SeqCst);
    }

    fn set_active_sink(&self, sink: Option<Arc<dyn ProgressSink>>) {
        *self
            .active_sink
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = sink;
    }

    /// 发送到当前进度接收器，没有接收器时丢弃
    pub(crate) fn report(&self, message: &str, level: ProgressLevel) {
        let sink = self
            .active_sink
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(sink) = sink {
            sink.report(message, level);
        }
    }

    /// 对目标执行一次攻击
    pub async fn execute(
        &self,
        target: &str,
        attack: &Attack,
        sink: Arc<dyn ProgressSink>,
    ) -> Result<AttackOutcome> {
        let _active = ActiveAttack::start(self, sink);
        let ctx = AttackContext::new(self, attack.kind());
        attack::run(&ctx, target, attack).await
    }

    /// 按配置执行攻击，参数取自 `defaults`
    ///
    /// 配置中除类型和目标外的字段目前不参与执行。
    pub async fn execute_config(
        &self,
        config: &AttackConfig,
        defaults: &AttackDefaults,
        sink: Arc<dyn ProgressSink>,
    ) -> Result<AttackOutcome> {
        let attack = Attack::from_kind(config.kind, defaults);
        self.execute(&config.target_address, &attack, sink).await
    }
}

/// 攻击执行期间持有接收器，结束（或 future 被丢弃）时释放
struct ActiveAttack<'a> {
    session: &'a Session,
}

impl<'a> ActiveAttack<'a> {
    fn start(session: &'a Session, sink: Arc<dyn ProgressSink>) -> Self {
        session.set_active_sink(Some(sink));
        session.attacking.store(true, Ordering::SeqCst);
        Self { session }
    }
}

impl Drop for ActiveAttack<'_> {
    fn drop(&mut self) {
        self.session.attacking.store(false, Ordering::SeqCst);
        self.session.set_active_sink(None);
    }
}
