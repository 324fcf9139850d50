//! 单次攻击的执行上下文

use super::{AttackKind, AttackPhase};
use crate::progress::ProgressLevel;
use crate::session::Session;
use crate::transport::TransportManager;
use std::sync::{Mutex, PoisonError};

pub struct AttackContext<'a> {
    session: &'a Session,
    kind: AttackKind,
    phase: Mutex<AttackPhase>,
}

impl<'a> AttackContext<'a> {
    pub(crate) fn new(session: &'a Session, kind: AttackKind) -> Self {
        Self {
            session,
            kind,
            phase: Mutex::new(AttackPhase::NotStarted),
        }
    }

    pub fn kind(&self) -> AttackKind {
        self.kind
    }

    pub fn phase(&self) -> AttackPhase {
        *self.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn transport(&self) -> &TransportManager {
        self.session.transport()
    }

    pub fn enter(&self, phase: AttackPhase) {
        let from = std::mem::replace(
            &mut *self.phase.lock().unwrap_or_else(PoisonError::into_inner),
            phase,
        );
        self.session.diagnostics().debug(
            2,
            format_args!("{}: {:?} -> {:?}", self.kind, from, phase),
        );
    }

    /// 标记攻击开始运行，清除之前的停止请求
    pub fn begin(&self) {
        self.session.reset_cancel();
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.session.is_cancelled()
    }

    pub fn info(&self, message: &str) {
        self.session.report(message, ProgressLevel::Info);
    }

    pub fn warn(&self, message: &str) {
        self.session.report(message, ProgressLevel::Warning);
    }

    pub fn error(&self, message: &str) {
        self.session.report(message, ProgressLevel::Error);
    }
}
