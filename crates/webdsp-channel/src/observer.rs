//! Notifications out of the channel.
//!
//! [`UiCallbacks`] receives the functions the host invokes on the UI.
//! [`ChannelObserver`] receives connection state; any number may subscribe.

use crate::codec::FunctionId;
use crate::value::Value;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Host → UI functions. Every method defaults to doing nothing.
pub trait UiCallbacks: Send + Sync {
    fn parameter_changed(&self, _index: u32, _value: f64) {}

    fn state_changed(&self, _key: &str, _value: &str) {}

    fn size_changed(&self, _width: f64, _height: f64) {}

    fn program_loaded(&self, _index: u32) {}

    fn sample_rate_changed(&self, _rate: f64) {}

    /// Any message no pending call or registered function claimed.
    fn message_received(&self, _function: &FunctionId, _args: &[Value]) {}
}

/// Callbacks that ignore everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCallbacks;

impl UiCallbacks for NoCallbacks {}

pub trait ChannelObserver: Send + Sync {
    fn channel_open(&self) {}

    /// Pending calls have already been rejected when this runs.
    fn channel_closed(&self) {}

    /// Half the round trip of the last ping.
    fn network_latency_changed(&self, _latency: Duration) {}
}

/// Surface the offline indicator draws on.
pub trait OfflineView: Send + Sync {
    fn show(&self);
    fn hide(&self);
}

/// Shows an offline affordance once the channel has been closed for a grace
/// period, and hides it as soon as the channel reopens.
pub struct OfflineIndicator {
    view: Arc<dyn OfflineView>,
    grace: Duration,
    visible: Arc<AtomicBool>,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl OfflineIndicator {
    pub fn new(view: Arc<dyn OfflineView>, grace: Duration) -> Self {
        Self {
            view,
            grace,
            visible: Arc::new(AtomicBool::new(false)),
            timer: Mutex::new(None),
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible.load(Ordering::Acquire)
    }

    fn show_now(view: &dyn OfflineView, visible: &AtomicBool) {
        if !visible.swap(true, Ordering::AcqRel) {
            view.show();
        }
    }
}

impl ChannelObserver for OfflineIndicator {
    fn channel_open(&self) {
        if let Some(timer) = self.timer.lock().take() {
            timer.abort();
        }
        if self.visible.swap(false, Ordering::AcqRel) {
            self.view.hide();
        }
    }

    fn channel_closed(&self) {
        let mut timer = self.timer.lock();
        if let Some(previous) = timer.take() {
            previous.abort();
        }

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            Self::show_now(self.view.as_ref(), &self.visible);
            return;
        };

        let view = Arc::clone(&self.view);
        let visible = Arc::clone(&self.visible);
        let grace = self.grace;
        *timer = Some(runtime.spawn(async move {
            tokio::time::sleep(grace).await;
            Self::show_now(view.as_ref(), &visible);
        }));
    }
}

impl Drop for OfflineIndicator {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.get_mut().take() {
            timer.abort();
        }
    }
}
