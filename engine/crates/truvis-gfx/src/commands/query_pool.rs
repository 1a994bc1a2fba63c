use ash::prelude::VkResult;
use ash::vk;

use crate::{
    foundation::{debug_messenger::DebugType, device::GfxDevice},
    lifetime::{entries::DeviceEntry, lifetime::GfxLifetime},
};

/// # Destroy
/// 创建时登记到某个作用域，由作用域负责销毁
#[derive(Clone, Copy)]
pub struct GfxQueryPool {
    handle: vk::QueryPool,
    query_type: vk::QueryType,

    /// pool 的容量
    count: u32,
}

// 创建
impl GfxQueryPool {
    pub fn new(
        device: &GfxDevice,
        lifetime: &mut GfxLifetime,
        query_type: vk::QueryType,
        count: u32,
        debug_name: &str,
    ) -> Self {
        let create_info = vk::QueryPoolCreateInfo::default().query_type(query_type).query_count(count);
        let handle = match unsafe { device.create_query_pool(&create_info, None) } {
            Ok(handle) => handle,
            Err(e) => panic!("failed to create query pool {}: {:?}", debug_name, e),
        };
        lifetime.tie_device(DeviceEntry::QueryPool(handle));

        let query_pool = Self {
            handle,
            query_type,
            count,
        };
        device.set_debug_name(&query_pool, debug_name);
        query_pool
    }
}

// getters
impl GfxQueryPool {
    #[inline]
    pub fn handle(&self) -> vk::QueryPool {
        self.handle
    }
    #[inline]
    pub fn query_type(&self) -> vk::QueryType {
        self.query_type
    }
    #[inline]
    pub fn count(&self) -> u32 {
        self.count
    }
}

// tools
impl GfxQueryPool {
    /// 读取全部 query 的 64 位结果
    ///
    /// 调用之前需要保证这些 query 已经被写入，例如等待过提交它们的 fence
    pub fn get_results_u64(&self, device: &GfxDevice) -> VkResult<Vec<u64>> {
        let mut results = vec![0u64; self.count as usize];
        unsafe {
            device.get_query_pool_results(
                self.handle,
                0,
                &mut results,
                vk::QueryResultFlags::TYPE_64 | vk::QueryResultFlags::WAIT,
            )?;
        }
        Ok(results)
    }
}

/// 两个 timestamp 之间的毫秒数
///
/// 只有低 valid_bits 位有效，计数器回绕时按照回绕处理
pub fn timestamp_delta_ms(begin: u64, end: u64, timestamp_period_ns: f32, valid_bits: u32) -> f32 {
    let mask = if valid_bits >= 64 { u64::MAX } else { (1u64 << valid_bits) - 1 };
    let ticks = (end & mask).wrapping_sub(begin & mask) & mask;
    (ticks as f64 * timestamp_period_ns as f64 / 1_000_000.0) as f32
}

impl DebugType for GfxQueryPool {
    fn debug_type_name() -> &'static str {
        "GfxQueryPool"
    }

    fn vk_handle(&self) -> impl vk::Handle + Copy {
        self.handle
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_delta_ms() {
        // 1 tick = 1 ns
        assert_eq!(timestamp_delta_ms(1_000, 2_001_000, 1.0, 64), 2.0);
        // 1 tick = 52.08 ns
        let ms = timestamp_delta_ms(0, 19_200, 52.083_33, 64);
        assert!((ms - 1.0).abs() < 1e-3);
        assert_eq!(timestamp_delta_ms(5, 5, 1.0, 64), 0.0);
    }

    #[test]
    fn test_timestamp_delta_wraps_in_valid_bits() {
        // 36 位计数器从末尾回绕到开头
        let max = (1u64 << 36) - 1;
        assert_eq!(timestamp_delta_ms(max - 999_999, 1_000_000, 1.0, 36), 2.0);
        // 无效的高位被忽略
        assert_eq!(timestamp_delta_ms(1 << 40, (1 << 40) + 3_000_000, 1.0, 36), 3.0);
    }
}
