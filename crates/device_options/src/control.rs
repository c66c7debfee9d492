//! 控制通道抽象
//!
//! 控制通道负责同步的选项查询，通常需要一次设备往返。

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};
use std::thread;
use std::time::Duration;

use contracts::{ContractError, OptionId};
use tracing::trace;

/// 设备选项的同步请求/应答接口
pub trait ControlChannel: Send + Sync {
    /// 从设备读取 `id` 的当前值
    fn query_option(&self, id: &OptionId) -> Result<f32, ContractError>;
}

/// 内存模拟控制通道
///
/// 从值表中应答查询，可选地休眠以模拟设备往返。
/// 记录每一次查询，测试据此判断是否走了慢路径。
#[derive(Debug, Default)]
pub struct MockControlChannel {
    values: RwLock<HashMap<OptionId, f32>>,
    latency: Option<Duration>,
    failing: AtomicBool,
    queries: AtomicU64,
}

impl MockControlChannel {
    /// 创建空通道，无延迟
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: 预设选项值
    pub fn with_value(self, id: OptionId, value: f32) -> Self {
        self.set_value(id, value);
        self
    }

    /// Builder: 每次查询休眠的时长
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// 设置设备为 `id` 返回的值
    pub fn set_value(&self, id: OptionId, value: f32) {
        self.values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, value);
    }

    /// 让后续查询全部失败 (或恢复成功)
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::Relaxed);
    }

    /// 迄今为止的查询次数 (含失败)
    pub fn query_count(&self) -> u64 {
        self.queries.load(Ordering::Relaxed)
    }
}

impl ControlChannel for MockControlChannel {
    fn query_option(&self, id: &OptionId) -> Result<f32, ContractError> {
        self.queries.fetch_add(1, Ordering::Relaxed);
        if let Some(latency) = self.latency {
            thread::sleep(latency);
        }
        if self.failing.load(Ordering::Relaxed) {
            return Err(ContractError::option_query(id.as_str(), "control channel unavailable"));
        }

        let value = self
            .values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id.as_str())
            .copied()
            .ok_or_else(|| ContractError::option_query(id.as_str(), "no such option on device"))?;

        trace!(option_id = %id, value, "mock control reply");
        Ok(value)
    }
}
