//! Auto-updated option
//!
//! The device reports this option's value on its own (notifications or periodic polling),
//! so readers take the cached copy instead of paying for a control-reply cycle.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use contracts::{CachedValue, ContractError, OptionHandle, OptionId};
use tracing::{debug, trace, warn};

use crate::control::ControlChannel;

/// Bit pattern of a quiet NaN, meaning "nothing received yet"
const NO_VALUE: u32 = 0x7fc0_0000;

/// Option whose last known value is kept in a single atomic word.
///
/// Writers (the update path) and readers (the frame path) never lock. Until the first
/// report arrives the option is [`CachedValue::Pending`] and readers must not query it.
pub struct AutoUpdatedOption {
    option_id: OptionId,
    channel: Arc<dyn ControlChannel>,
    last_known: AtomicU32,
}

impl AutoUpdatedOption {
    /// Create an option with no cached value
    pub fn new(option_id: OptionId, channel: Arc<dyn ControlChannel>) -> Self {
        Self {
            option_id,
            channel,
            last_known: AtomicU32::new(NO_VALUE),
        }
    }

    /// Record a value reported by the device.
    ///
    /// Non-finite reports are dropped and the previous value is kept; NaN is the
    /// "nothing received" marker.
    pub fn update_last_known(&self, value: f32) {
        if !value.is_finite() {
            warn!(option_id = %self.option_id, value, "ignoring non-finite option report");
            return;
        }
        self.last_known.store(value.to_bits(), Ordering::Relaxed);
        trace!(option_id = %self.option_id, value, "last known value updated");
    }

    /// Forget the cached value (e.g. after a device reset)
    pub fn clear_last_known(&self) {
        self.last_known.store(NO_VALUE, Ordering::Relaxed);
    }

    /// Value most recently reported, `None` before the first report
    #[inline]
    pub fn last_known_value(&self) -> Option<f32> {
        let value = f32::from_bits(self.last_known.load(Ordering::Relaxed));
        (!value.is_nan()).then_some(value)
    }

    /// Refresh the cache from the device every `interval` on a background thread.
    ///
    /// Query failures keep the previous value. The thread is joined when the returned
    /// [`AutoReport`] is stopped or dropped.
    pub fn spawn_auto_report(self: &Arc<Self>, interval: Duration) -> AutoReport {
        let running = Arc::new(AtomicBool::new(true));
        let option = Arc::clone(self);
        let flag = running.clone();

        let handle = thread::spawn(move || {
            debug!(option_id = %option.option_id, ?interval, "auto report started");
            while flag.load(Ordering::Relaxed) {
                if let Err(e) = option.query() {
                    warn!(option_id = %option.option_id, error = %e, "auto report query failed");
                }
                // stop() unparks, so shutdown does not wait out the interval
                thread::park_timeout(interval);
            }
            debug!(option_id = %option.option_id, "auto report stopped");
        });

        AutoReport {
            running,
            handle: Mutex::new(Some(handle)),
        }
    }
}

impl OptionHandle for AutoUpdatedOption {
    fn option_id(&self) -> &OptionId {
        &self.option_id
    }

    #[inline]
    fn cached_value(&self) -> CachedValue {
        match self.last_known_value() {
            Some(value) => CachedValue::Known(value),
            None => CachedValue::Pending,
        }
    }

    fn query(&self) -> Result<f32, ContractError> {
        let value = self.channel.query_option(&self.option_id)?;
        self.update_last_known(value);
        Ok(value)
    }
}

/// Background refresh started by [`AutoUpdatedOption::spawn_auto_report`].
///
/// Stops and joins the refresh thread when dropped.
pub struct AutoReport {
    running: Arc<AtomicBool>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl AutoReport {
    /// Stop the refresh thread and wait for it to exit. Idempotent.
    pub fn stop(&self) {
        self.running.store(false, Ordering::Relaxed);

        let handle = match self.handle.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(handle) = handle {
            handle.thread().unpark();
            if handle.join().is_err() {
                warn!("auto report thread panicked");
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }
}

impl Drop for AutoReport {
    fn drop(&mut self) {
        self.stop();
    }
}
