//! Delivery of new-repository notifications.

mod dingtalk;

pub use dingtalk::{render_message, sign, DingTalkNotifier, Message};

use crate::model::Record;
use async_trait::async_trait;
use serde::Serialize;

/// Outcome of one [`Notifier::notify`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NotifyReport {
    pub sent: usize,
    pub failed: usize,
}

/// Sends one message per record. A failed record never stops the others.
#[async_trait]
pub trait Notifier: Send + Sync {
    fn name(&self) -> &'static str;
    async fn notify(&self, records: &[Record]) -> NotifyReport;
}
