use std::ptr::NonNull;

use ash::vk;

use truvis_gfx::{
    foundation::debug_messenger::DebugType,
    lifetime::{entries::AllocatorEntry, lifetime::GfxLifetime},
};

/// buffer 的所有权来源
pub enum BufferSource {
    Allocated {
        allocation: vk_mem::Allocation,
        /// 是否处于持久映射状态
        mapped: bool,
    },
    External,
}

/// 一个 buffer 的物理记录
///
/// CPU_TO_GPU 的 buffer 在创建时就完成映射，映射一直保持到销毁
pub struct BufferResource {
    buffer: vk::Buffer,
    source: BufferSource,

    usage: vk::BufferUsageFlags,
    size: vk::DeviceSize,

    mapped_ptr: Option<NonNull<u8>>,
}

impl DebugType for BufferResource {
    fn debug_type_name() -> &'static str {
        "BufferResource"
    }

    fn vk_handle(&self) -> impl vk::Handle + Copy {
        self.buffer
    }
}

impl Drop for BufferResource {
    fn drop(&mut self) {
        if std::thread::panicking() {
            return;
        }
        if matches!(self.source, BufferSource::Allocated { .. }) {
            panic!("buffer {:?} dropped without being tied to a lifetime", self.buffer);
        }
    }
}

// new & init
impl BufferResource {
    /// mapped_ptr 由 vma 的 map_memory 得到，为 None 表示不可由 CPU 访问
    pub fn new_allocated(
        buffer: vk::Buffer,
        allocation: vk_mem::Allocation,
        mapped_ptr: Option<*mut u8>,
        usage: vk::BufferUsageFlags,
        size: vk::DeviceSize,
    ) -> Self {
        let mapped_ptr = mapped_ptr.and_then(NonNull::new);
        Self {
            buffer,
            source: BufferSource::Allocated {
                allocation,
                mapped: mapped_ptr.is_some(),
            },
            usage,
            size,
            mapped_ptr,
        }
    }

    pub fn from_external_buffer(buffer: vk::Buffer, usage: vk::BufferUsageFlags, size: vk::DeviceSize) -> Self {
        Self {
            buffer,
            source: BufferSource::External,
            usage,
            size,
            mapped_ptr: None,
        }
    }

    /// 为外部 buffer 指定一个 CPU 可写的映射
    ///
    /// # Safety
    /// ptr 指向至少 size 字节的可写内存，并且在 record 存活期间一直有效
    pub unsafe fn with_host_mapping(mut self, ptr: *mut u8) -> Self {
        self.mapped_ptr = NonNull::new(ptr);
        self
    }
}

// getters
impl BufferResource {
    #[inline]
    pub fn handle(&self) -> vk::Buffer {
        self.buffer
    }
    #[inline]
    pub fn usage(&self) -> vk::BufferUsageFlags {
        self.usage
    }
    #[inline]
    pub fn size(&self) -> vk::DeviceSize {
        self.size
    }
    #[inline]
    pub fn is_mapped(&self) -> bool {
        self.mapped_ptr.is_some()
    }
    #[inline]
    pub fn is_external(&self) -> bool {
        matches!(self.source, BufferSource::External)
    }
}

// update
impl BufferResource {
    fn mapped_bytes_mut(&mut self) -> &mut [u8] {
        let Some(ptr) = self.mapped_ptr else {
            panic!("buffer {:?} is not host mapped", self.buffer);
        };
        // mapped_ptr 指向 size 字节的持久映射，record 独占访问
        unsafe { std::slice::from_raw_parts_mut(ptr.as_ptr(), self.size as usize) }
    }

    /// 以 T 的形式读写 buffer 的开头部分
    pub fn update<T: bytemuck::Pod>(&mut self, f: impl FnOnce(&mut T)) {
        let size = size_of::<T>();
        let bytes = self.mapped_bytes_mut();
        if size > bytes.len() {
            panic!("buffer of {} bytes can not hold {} bytes", bytes.len(), size);
        }
        f(bytemuck::from_bytes_mut(&mut bytes[..size]));
    }

    pub fn write_bytes(&mut self, offset: usize, data: &[u8]) {
        let bytes = self.mapped_bytes_mut();
        let end = offset + data.len();
        if end > bytes.len() {
            panic!("write [{}, {}) out of buffer range {}", offset, end, bytes.len());
        }
        bytes[offset..end].copy_from_slice(data);
    }
}

// destroy
impl BufferResource {
    /// 将 buffer 与 allocation 交给 lifetime，外部 buffer 什么都不做
    pub fn tie(mut self, lifetime: &mut GfxLifetime) {
        if let BufferSource::Allocated { allocation, mapped } =
            std::mem::replace(&mut self.source, BufferSource::External)
        {
            self.mapped_ptr = None;
            lifetime.tie_allocator(AllocatorEntry::Buffer {
                buffer: self.buffer,
                allocation,
                mapped,
            });
        }
    }
}
