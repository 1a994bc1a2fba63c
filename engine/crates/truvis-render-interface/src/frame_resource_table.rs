use crate::{
    buffer_resource::BufferResource,
    handles::{GfxBufferHandle, GfxImageHandle, ResourceScope},
    image_resource::ImageResource,
    pipeline_settings::FrameLabel,
};

/// 三个 scope 在扁平数组中的起始位置，顺序固定为 transient、storage、external
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScopeBases {
    pub transient: usize,
    pub storage: usize,
    pub external: usize,
    pub end: usize,
}

impl ScopeBases {
    pub fn new(transient_count: usize, storage_count: usize, external_count: usize) -> Self {
        Self {
            transient: 0,
            storage: transient_count,
            external: transient_count + storage_count,
            end: transient_count + storage_count + external_count,
        }
    }

    #[inline]
    pub fn base(&self, scope: ResourceScope) -> usize {
        match scope {
            ResourceScope::Transient => self.transient,
            ResourceScope::Storage => self.storage,
            ResourceScope::External => self.external,
        }
    }

    #[inline]
    pub fn count(&self, scope: ResourceScope) -> usize {
        match scope {
            ResourceScope::Transient => self.storage - self.transient,
            ResourceScope::Storage => self.external - self.storage,
            ResourceScope::External => self.end - self.external,
        }
    }

    /// scope 内的序号转换为扁平数组的下标，超出 scope 的范围时 panic
    #[inline]
    pub fn resolve(&self, scope: ResourceScope, index: usize) -> usize {
        let count = self.count(scope);
        if index >= count {
            panic!("{:?} index {} out of range, only {} registered in this table", scope, index, count);
        }
        self.base(scope) + index
    }
}

/// 一帧内所有资源的扁平视图
///
/// 由 GfxResourceManager::acquire_frame_data 创建，必须交还给 release_frame_data。
/// handle 只在同一张 table 内有意义，不能跨帧缓存。
///
/// 生命周期分为两段：
/// - recording：三个 scope 的 record 都可以访问
/// - in flight：finish_recording 之后 storage 已经归还给管理器，external 被清空，
///   table 只持有 transient record，直到这个 slot 的 fence 被等待之后才能 release
pub struct FrameResourceTable {
    owner: u64,
    serial: u64,
    frame_label: FrameLabel,
    recording: bool,

    images: Vec<Option<ImageResource>>,
    buffers: Vec<Option<BufferResource>>,
    image_bases: ScopeBases,
    buffer_bases: ScopeBases,

    released: bool,
}

impl Drop for FrameResourceTable {
    fn drop(&mut self) {
        if std::thread::panicking() {
            return;
        }
        if !self.released {
            panic!("frame resource table #{} dropped without release_frame_data", self.serial);
        }
    }
}

// new & init
impl FrameResourceTable {
    pub(crate) fn new(
        owner: u64,
        serial: u64,
        frame_label: FrameLabel,
        (images, image_bases): (Vec<Option<ImageResource>>, ScopeBases),
        (buffers, buffer_bases): (Vec<Option<BufferResource>>, ScopeBases),
    ) -> Self {
        Self {
            owner,
            serial,
            frame_label,
            recording: true,
            images,
            buffers,
            image_bases,
            buffer_bases,
            released: false,
        }
    }
}

// getters
impl FrameResourceTable {
    #[inline]
    pub fn serial(&self) -> u64 {
        self.serial
    }
    #[inline]
    pub fn frame_label(&self) -> FrameLabel {
        self.frame_label
    }
    #[inline]
    pub fn is_recording(&self) -> bool {
        self.recording
    }
    #[inline]
    pub(crate) fn owner(&self) -> u64 {
        self.owner
    }
    #[inline]
    pub fn image_bases(&self) -> ScopeBases {
        self.image_bases
    }
    #[inline]
    pub fn buffer_bases(&self) -> ScopeBases {
        self.buffer_bases
    }

    #[inline]
    pub fn image_index(&self, handle: GfxImageHandle) -> usize {
        self.image_bases.resolve(handle.scope(), handle.index())
    }
    #[inline]
    pub fn buffer_index(&self, handle: GfxBufferHandle) -> usize {
        self.buffer_bases.resolve(handle.scope(), handle.index())
    }

    pub fn get_image(&self, handle: GfxImageHandle) -> &ImageResource {
        let index = self.image_index(handle);
        self.images[index]
            .as_ref()
            .unwrap_or_else(|| panic!("{:?} is not filled in this frame", handle))
    }

    pub fn get_image_mut(&mut self, handle: GfxImageHandle) -> &mut ImageResource {
        let index = self.image_index(handle);
        self.images[index]
            .as_mut()
            .unwrap_or_else(|| panic!("{:?} is not filled in this frame", handle))
    }

    pub fn get_buffer(&self, handle: GfxBufferHandle) -> &BufferResource {
        let index = self.buffer_index(handle);
        self.buffers[index]
            .as_ref()
            .unwrap_or_else(|| panic!("{:?} is not filled in this frame", handle))
    }

    pub fn get_buffer_mut(&mut self, handle: GfxBufferHandle) -> &mut BufferResource {
        let index = self.buffer_index(handle);
        self.buffers[index]
            .as_mut()
            .unwrap_or_else(|| panic!("{:?} is not filled in this frame", handle))
    }

    #[inline]
    pub fn is_image_filled(&self, handle: GfxImageHandle) -> bool {
        self.images[self.image_index(handle)].is_some()
    }
}

// update
impl FrameResourceTable {
    /// 填入外部持有的 image，只接受 External scope 的 handle 与外部 record
    pub fn set_external_image(&mut self, handle: GfxImageHandle, image: ImageResource) {
        if handle.scope() != ResourceScope::External {
            panic!("{:?} is not an external image", handle);
        }
        if !image.is_external() {
            panic!("{:?} only accepts externally owned images", handle);
        }
        if !self.recording {
            panic!("{:?} filled after frame table #{} finished recording", handle, self.serial);
        }
        let index = self.image_index(handle);
        self.images[index] = Some(image);
    }

    /// 填入外部持有的 buffer，只接受 External scope 的 handle 与外部 record
    pub fn set_external_buffer(&mut self, handle: GfxBufferHandle, buffer: BufferResource) {
        if handle.scope() != ResourceScope::External {
            panic!("{:?} is not an external buffer", handle);
        }
        if !buffer.is_external() {
            panic!("{:?} only accepts externally owned buffers", handle);
        }
        if !self.recording {
            panic!("{:?} filled after frame table #{} finished recording", handle, self.serial);
        }
        let index = self.buffer_index(handle);
        self.buffers[index] = Some(buffer);
    }

    /// recording 结束：交出 storage record，丢弃 external 的引用
    pub(crate) fn end_recording(&mut self) -> (Vec<Option<ImageResource>>, Vec<Option<BufferResource>>) {
        self.recording = false;
        (
            Self::split_off_non_transient(&mut self.images, self.image_bases),
            Self::split_off_non_transient(&mut self.buffers, self.buffer_bases),
        )
    }

    /// 按照 [storage, external) 的顺序取出，原位置留空
    fn split_off_non_transient<R>(records: &mut [Option<R>], bases: ScopeBases) -> Vec<Option<R>> {
        let storage = records[bases.storage..bases.external].iter_mut().map(Option::take).collect();
        for record in &mut records[bases.external..bases.end] {
            *record = None;
        }
        storage
    }

    /// 取出所有记录，table 视为已经归还
    pub(crate) fn take_records(&mut self) -> (Vec<Option<ImageResource>>, Vec<Option<BufferResource>>) {
        self.released = true;
        (std::mem::take(&mut self.images), std::mem::take(&mut self.buffers))
    }
}
