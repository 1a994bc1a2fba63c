use ash::vk;

/// 由 instance 负责销毁的对象
pub enum InstanceEntry {
    /// logical device 本身，销毁需要 device 的函数指针
    Device(ash::Device),
    DebugMessenger(vk::DebugUtilsMessengerEXT),
    Surface(vk::SurfaceKHR),
}
impl InstanceEntry {
    pub fn kind_name(&self) -> &'static str {
        match self {
            InstanceEntry::Device(_) => "Device",
            InstanceEntry::DebugMessenger(_) => "DebugMessenger",
            InstanceEntry::Surface(_) => "Surface",
        }
    }
}

/// 由 device 负责销毁的对象，全部是 Copy 的裸 handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceEntry {
    CommandPool(vk::CommandPool),
    ImageView(vk::ImageView),
    Swapchain(vk::SwapchainKHR),
    Fence(vk::Fence),
    Semaphore(vk::Semaphore),
    QueryPool(vk::QueryPool),
}
impl DeviceEntry {
    pub fn kind_name(&self) -> &'static str {
        match self {
            DeviceEntry::CommandPool(_) => "CommandPool",
            DeviceEntry::ImageView(_) => "ImageView",
            DeviceEntry::Swapchain(_) => "Swapchain",
            DeviceEntry::Fence(_) => "Fence",
            DeviceEntry::Semaphore(_) => "Semaphore",
            DeviceEntry::QueryPool(_) => "QueryPool",
        }
    }
}

/// 由 vma 负责销毁的对象：handle 与其 allocation 成对出现
pub enum AllocatorEntry {
    Image {
        image: vk::Image,
        allocation: vk_mem::Allocation,
    },
    Buffer {
        buffer: vk::Buffer,
        allocation: vk_mem::Allocation,
        /// 是否处于持久映射状态，销毁之前需要先 unmap
        mapped: bool,
    },
}
impl AllocatorEntry {
    pub fn kind_name(&self) -> &'static str {
        match self {
            AllocatorEntry::Image { .. } => "Image",
            AllocatorEntry::Buffer { .. } => "Buffer",
        }
    }
}

#[cfg(test)]
mod tests {
    use ash::vk::Handle;

    use super::*;

    #[test]
    fn test_device_entry_kind_names() {
        let entries = [
            DeviceEntry::CommandPool(vk::CommandPool::from_raw(1)),
            DeviceEntry::ImageView(vk::ImageView::from_raw(2)),
            DeviceEntry::Swapchain(vk::SwapchainKHR::from_raw(3)),
            DeviceEntry::Fence(vk::Fence::from_raw(4)),
            DeviceEntry::Semaphore(vk::Semaphore::from_raw(5)),
            DeviceEntry::QueryPool(vk::QueryPool::from_raw(6)),
        ];
        let names = entries.map(|entry| entry.kind_name());
        assert_eq!(names, ["CommandPool", "ImageView", "Swapchain", "Fence", "Semaphore", "QueryPool"]);
    }
}
