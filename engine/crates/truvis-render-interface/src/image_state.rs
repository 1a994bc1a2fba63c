use ash::vk;

/// image 当前的同步状态：最近一次 barrier 之后的 access、stage、layout 与所属 queue family
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageSyncState {
    pub access: vk::AccessFlags2,
    pub stage: vk::PipelineStageFlags2,
    pub layout: vk::ImageLayout,
    pub queue_family: u32,
}

impl Default for ImageSyncState {
    fn default() -> Self {
        Self::UNDEFINED
    }
}

// presets
impl ImageSyncState {
    /// 内容可以被丢弃
    pub const UNDEFINED: Self = Self {
        access: vk::AccessFlags2::NONE,
        stage: vk::PipelineStageFlags2::TOP_OF_PIPE,
        layout: vk::ImageLayout::UNDEFINED,
        queue_family: vk::QUEUE_FAMILY_IGNORED,
    };

    pub const COLOR_ATTACHMENT_OUTPUT: Self = Self {
        access: vk::AccessFlags2::from_raw(
            vk::AccessFlags2::COLOR_ATTACHMENT_READ.as_raw() | vk::AccessFlags2::COLOR_ATTACHMENT_WRITE.as_raw(),
        ),
        stage: vk::PipelineStageFlags2::COLOR_ATTACHMENT_OUTPUT,
        layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
        queue_family: vk::QUEUE_FAMILY_IGNORED,
    };

    pub const FRAGMENT_SHADER_READ_ONLY: Self = Self {
        access: vk::AccessFlags2::SHADER_READ,
        stage: vk::PipelineStageFlags2::FRAGMENT_SHADER,
        layout: vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
        queue_family: vk::QUEUE_FAMILY_IGNORED,
    };

    /// fragment shader 中作为 storage image 读取
    pub const FRAGMENT_STORAGE_READ: Self = Self {
        access: vk::AccessFlags2::SHADER_STORAGE_READ,
        stage: vk::PipelineStageFlags2::FRAGMENT_SHADER,
        layout: vk::ImageLayout::GENERAL,
        queue_family: vk::QUEUE_FAMILY_IGNORED,
    };

    pub const LATE_DEPTH: Self = Self {
        access: vk::AccessFlags2::from_raw(
            vk::AccessFlags2::DEPTH_STENCIL_ATTACHMENT_READ.as_raw()
                | vk::AccessFlags2::DEPTH_STENCIL_ATTACHMENT_WRITE.as_raw(),
        ),
        stage: vk::PipelineStageFlags2::LATE_FRAGMENT_TESTS,
        layout: vk::ImageLayout::DEPTH_ATTACHMENT_OPTIMAL,
        queue_family: vk::QUEUE_FAMILY_IGNORED,
    };

    /// present engine 的访问不需要 access mask
    pub const PRESENT: Self = Self {
        access: vk::AccessFlags2::NONE,
        stage: vk::PipelineStageFlags2::BOTTOM_OF_PIPE,
        layout: vk::ImageLayout::PRESENT_SRC_KHR,
        queue_family: vk::QUEUE_FAMILY_IGNORED,
    };

    pub const TRANSFER_DST: Self = Self {
        access: vk::AccessFlags2::TRANSFER_WRITE,
        stage: vk::PipelineStageFlags2::TRANSFER,
        layout: vk::ImageLayout::TRANSFER_DST_OPTIMAL,
        queue_family: vk::QUEUE_FAMILY_IGNORED,
    };

    pub const TRANSFER_SRC: Self = Self {
        access: vk::AccessFlags2::TRANSFER_READ,
        stage: vk::PipelineStageFlags2::TRANSFER,
        layout: vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
        queue_family: vk::QUEUE_FAMILY_IGNORED,
    };
}

// tools
impl ImageSyncState {
    /// 指定所属的 queue family，用于跨 queue 的所有权转移
    #[inline]
    pub const fn with_queue_family(mut self, queue_family: u32) -> Self {
        self.queue_family = queue_family;
        self
    }

    /// 从 self 迁移到 next 是否需要 barrier：layout 或所属 queue 不同
    #[inline]
    pub fn needs_barrier_to(&self, next: &Self) -> bool {
        self.layout != next.layout || self.queue_family != next.queue_family
    }

    /// 只有两端都明确指定了 queue family 且不同，才是一次所有权转移
    #[inline]
    pub fn is_queue_transfer_to(&self, next: &Self) -> bool {
        self.queue_family != next.queue_family
            && self.queue_family != vk::QUEUE_FAMILY_IGNORED
            && next.queue_family != vk::QUEUE_FAMILY_IGNORED
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_layout_needs_no_barrier() {
        let read = ImageSyncState::FRAGMENT_SHADER_READ_ONLY;
        assert!(!read.needs_barrier_to(&read));
        assert!(read.needs_barrier_to(&ImageSyncState::COLOR_ATTACHMENT_OUTPUT));
    }

    #[test]
    fn test_queue_transfer() {
        let gfx = ImageSyncState::TRANSFER_SRC.with_queue_family(0);
        let compute = ImageSyncState::TRANSFER_SRC.with_queue_family(1);
        assert!(gfx.needs_barrier_to(&compute));
        assert!(gfx.is_queue_transfer_to(&compute));
        assert!(!ImageSyncState::TRANSFER_SRC.is_queue_transfer_to(&compute));
    }

    #[test]
    fn test_default_is_undefined() {
        assert_eq!(ImageSyncState::default(), ImageSyncState::UNDEFINED);
        assert_eq!(ImageSyncState::UNDEFINED.layout, vk::ImageLayout::UNDEFINED);
    }
}
