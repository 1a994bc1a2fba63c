use crate::lifetime::{
    deletion_stack::{GfxDeletionStack, GfxDestroyer},
    entries::{AllocatorEntry, DeviceEntry},
};

/// 一个作用域内的所有 GPU 对象
///
/// 包含 device 栈与 allocator 栈。cleanup 时先清理 device 栈，再清理 allocator 栈：
/// image view 需要在其 image 之前销毁。
///
/// 常用的作用域：
/// - global：帧同步对象，以及退出时的资源池
/// - swapchain：swapchain 与其 image views，resize 时重建
/// - frame：每一帧 present 之后立即清理
pub struct GfxLifetime {
    device: GfxDeletionStack<DeviceEntry>,
    allocator: GfxDeletionStack<AllocatorEntry>,
}

// new & init
impl GfxLifetime {
    pub fn new(scope: &'static str) -> Self {
        Self {
            device: GfxDeletionStack::new(scope),
            allocator: GfxDeletionStack::new(scope),
        }
    }
}

// getters
impl GfxLifetime {
    #[inline]
    pub fn scope(&self) -> &'static str {
        self.device.scope()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.device.is_empty() && self.allocator.is_empty()
    }

    #[inline]
    pub fn device_entry_count(&self) -> usize {
        self.device.len()
    }

    #[inline]
    pub fn allocator_entry_count(&self) -> usize {
        self.allocator.len()
    }
}

// tools
impl GfxLifetime {
    #[inline]
    pub fn tie_device(&mut self, entry: DeviceEntry) {
        self.device.defer(entry);
    }

    #[inline]
    pub fn tie_allocator(&mut self, entry: AllocatorEntry) {
        self.allocator.defer(entry);
    }

    pub fn cleanup<D, A>(&mut self, device: &D, allocator: &A)
    where
        D: GfxDestroyer<DeviceEntry>,
        A: GfxDestroyer<AllocatorEntry>,
    {
        self.device.cleanup(device);
        self.allocator.cleanup(allocator);
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use ash::vk;
    use ash::vk::Handle;

    use super::*;

    /// 同时记录 device 与 allocator 的销毁顺序
    #[derive(Default)]
    struct Recorder {
        log: RefCell<Vec<String>>,
    }
    impl GfxDestroyer<DeviceEntry> for Recorder {
        fn destroy_entry(&self, entry: DeviceEntry) {
            self.log.borrow_mut().push(format!("device:{}", entry.kind_name()));
        }
    }
    impl GfxDestroyer<AllocatorEntry> for Recorder {
        fn destroy_entry(&self, entry: AllocatorEntry) {
            // 测试中无法构造 vma allocation，这里只记录顺序
            self.log.borrow_mut().push(format!("allocator:{}", entry.kind_name()));
            std::mem::forget(entry);
        }
    }

    #[test]
    fn test_device_stack_before_allocator_stack() {
        let recorder = Recorder::default();
        let mut lifetime = GfxLifetime::new("swapchain");

        lifetime.tie_device(DeviceEntry::Fence(vk::Fence::from_raw(1)));
        lifetime.tie_device(DeviceEntry::ImageView(vk::ImageView::from_raw(2)));
        assert_eq!(lifetime.device_entry_count(), 2);
        assert_eq!(lifetime.allocator_entry_count(), 0);
        assert!(!lifetime.is_empty());

        lifetime.cleanup(&recorder, &recorder);
        assert!(lifetime.is_empty());
        assert_eq!(*recorder.log.borrow(), vec!["device:ImageView", "device:Fence"]);
    }

    #[test]
    fn test_scope_name() {
        let lifetime = GfxLifetime::new("frame");
        assert_eq!(lifetime.scope(), "frame");
    }

    #[test]
    #[should_panic(expected = "pending entries")]
    fn test_drop_without_cleanup_panics() {
        let mut lifetime = GfxLifetime::new("leaky");
        lifetime.tie_device(DeviceEntry::Semaphore(vk::Semaphore::from_raw(3)));
        drop(lifetime);
    }
}
