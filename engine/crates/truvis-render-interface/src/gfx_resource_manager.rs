use std::{
    fmt::Debug,
    hash::Hash,
    sync::atomic::{AtomicU64, Ordering},
};

use indexmap::IndexMap;
use truvis_gfx::lifetime::lifetime::GfxLifetime;

use crate::{
    buffer_resource::BufferResource,
    frame_counter::FrameCounter,
    frame_resource_table::{FrameResourceTable, ScopeBases},
    handles::{GfxBufferHandle, GfxImageHandle, ResourceScope},
    image_resource::ImageResource,
    pipeline_settings::FrameLabel,
    resource_builder::{BufferBuilder, ImageBuilder},
    resource_definition::{BufferDefinition, BufferResourceId, ImageDefinition, ImageResourceId},
    resource_pool::{GfxResourcePool, PooledResource},
};

/// 资源定义的公共部分
pub trait ResourceDefinition: Copy + Eq + Hash + Debug {
    /// swapchain 重建之后需要重新创建
    fn depends_on_swapchain(&self) -> bool;
    fn debug_name(&self) -> &'static str;
}
impl ResourceDefinition for ImageDefinition {
    #[inline]
    fn depends_on_swapchain(&self) -> bool {
        ImageDefinition::depends_on_swapchain(self)
    }
    #[inline]
    fn debug_name(&self) -> &'static str {
        self.debug_name
    }
}
impl ResourceDefinition for BufferDefinition {
    #[inline]
    fn depends_on_swapchain(&self) -> bool {
        false
    }
    #[inline]
    fn debug_name(&self) -> &'static str {
        self.debug_name
    }
}

struct StorageSlot<D, R> {
    definition: D,
    /// None 表示尚未创建，或者 swapchain 重建之后等待重新创建
    record: Option<R>,
}

/// 同一类资源（image 或 buffer）在三个 scope 中的注册表
///
/// identity 在 IndexMap 中的位置就是 handle 的 index
struct ResourceRegistry<Id, D, R> {
    transient: IndexMap<Id, D>,
    storage: IndexMap<Id, StorageSlot<D, R>>,
    external: IndexMap<Id, D>,

    /// 以 definition 的值为 key，相等的 definition 共享同一个 pool
    pools: IndexMap<D, GfxResourcePool<D, R>>,
    /// 被替换掉的 storage record，等待 tie 到 lifetime
    retired: Vec<R>,
}

impl<Id, D, R> ResourceRegistry<Id, D, R>
where
    Id: Copy + Eq + Hash + Debug,
    D: ResourceDefinition,
    R: PooledResource,
{
    fn new() -> Self {
        Self {
            transient: IndexMap::new(),
            storage: IndexMap::new(),
            external: IndexMap::new(),
            pools: IndexMap::new(),
            retired: Vec::new(),
        }
    }

    fn scope_of(&self, id: &Id) -> Option<ResourceScope> {
        if self.transient.contains_key(id) {
            Some(ResourceScope::Transient)
        } else if self.storage.contains_key(id) {
            Some(ResourceScope::Storage)
        } else if self.external.contains_key(id) {
            Some(ResourceScope::External)
        } else {
            None
        }
    }

    fn find(&self, id: &Id) -> Option<(ResourceScope, usize)> {
        let scope = self.scope_of(id)?;
        let index = match scope {
            ResourceScope::Transient => self.transient.get_index_of(id),
            ResourceScope::Storage => self.storage.get_index_of(id),
            ResourceScope::External => self.external.get_index_of(id),
        }?;
        Some((scope, index))
    }

    /// 同一个 identity 只能属于一个 scope，并且 definition 不能改变
    fn check_registration(&self, id: &Id, scope: ResourceScope, definition: &D) -> Option<usize> {
        let (registered_scope, index) = self.find(id)?;
        if registered_scope != scope {
            panic!("{:?} is registered as {:?}, can not register as {:?}", id, registered_scope, scope);
        }
        let registered = match scope {
            ResourceScope::Transient => self.transient[index],
            ResourceScope::Storage => self.storage[index].definition,
            ResourceScope::External => self.external[index],
        };
        if registered != *definition {
            panic!(
                "{:?} re-registered with a different definition: {:?} -> {:?}",
                id, registered, definition
            );
        }
        Some(index)
    }

    fn register_transient(&mut self, id: Id, definition: D) -> usize {
        if let Some(index) = self.check_registration(&id, ResourceScope::Transient, &definition) {
            return index;
        }
        self.pools.entry(definition).or_insert_with(|| GfxResourcePool::new(definition));
        self.transient.insert_full(id, definition).0
    }

    fn register_external(&mut self, id: Id, definition: D) -> usize {
        if let Some(index) = self.check_registration(&id, ResourceScope::External, &definition) {
            return index;
        }
        self.external.insert_full(id, definition).0
    }

    fn register_storage(&mut self, id: Id, definition: D, record: Option<R>) -> usize {
        if let Some(index) = self.check_registration(&id, ResourceScope::Storage, &definition) {
            if let Some(record) = record {
                log::debug!("storage {:?} replaced", id);
                if let Some(old) = self.storage[index].record.replace(record) {
                    self.retired.push(old);
                }
            }
            return index;
        }
        self.storage.insert_full(id, StorageSlot { definition, record }).0
    }

    fn bases(&self) -> ScopeBases {
        ScopeBases::new(self.transient.len(), self.storage.len(), self.external.len())
    }

    /// transient 从 pool 中取出，storage 从常驻位置移出，external 留空
    fn checkout_all(&mut self, mut build: impl FnMut(&D) -> R) -> (Vec<Option<R>>, ScopeBases) {
        let bases = self.bases();
        let mut records = Vec::with_capacity(bases.end);

        for definition in self.transient.values() {
            let pool = self
                .pools
                .entry(*definition)
                .or_insert_with(|| GfxResourcePool::new(*definition));
            records.push(Some(pool.checkout(&mut build)));
        }
        for (id, slot) in self.storage.iter_mut() {
            let record = match slot.record.take() {
                Some(record) => record,
                None => {
                    log::debug!("build storage {:?}", id);
                    build(&slot.definition)
                }
            };
            records.push(Some(record));
        }
        records.resize_with(bases.end, || None);

        (records, bases)
    }

    /// storage 放回常驻位置，保留这一帧内的同步状态
    ///
    /// table 创建之后注册的 storage 不在 records 中
    fn return_storage(&mut self, records: Vec<Option<R>>) {
        if records.len() > self.storage.len() {
            panic!("frame table returns {} storage records, only {} registered", records.len(), self.storage.len());
        }
        for ((id, slot), record) in self.storage.iter_mut().zip(records) {
            let Some(record) = record else {
                panic!("storage {:?} missing at end of recording", id);
            };
            if let Some(old) = slot.record.replace(record) {
                self.retired.push(old);
            }
        }
    }

    /// transient 归还到 pool
    ///
    /// 只处理 table 创建时已经注册的 transient，storage 与 external 此时已经不在 table 中
    fn checkin_all(&mut self, records: Vec<Option<R>>, bases: ScopeBases) {
        if records.len() != bases.end {
            panic!("frame table holds {} records, its bases expect {}", records.len(), bases.end);
        }
        let transient_count = bases.count(ResourceScope::Transient);

        for ((id, definition), record) in self.transient.iter().take(transient_count).zip(records) {
            let Some(record) = record else {
                panic!("transient {:?} missing at release", id);
            };
            match self.pools.get_mut(definition) {
                Some(pool) => pool.checkin(record),
                None => panic!("pool of transient {:?} disappeared", id),
            }
        }
    }

    fn invalidate_swapchain_dependents(&mut self, lifetime: &mut GfxLifetime) -> usize {
        let mut count = 0;
        for pool in self.pools.values_mut() {
            if pool.definition().depends_on_swapchain() {
                count += pool.drain_spares(lifetime);
            }
        }
        for slot in self.storage.values_mut() {
            if slot.definition.depends_on_swapchain() {
                if let Some(record) = slot.record.take() {
                    record.tie(lifetime);
                    count += 1;
                }
            }
        }
        count
    }

    fn collect_retired(&mut self, lifetime: &mut GfxLifetime) -> usize {
        let count = self.retired.len();
        for record in self.retired.drain(..) {
            record.tie(lifetime);
        }
        count
    }

    fn destroy(&mut self, lifetime: &mut GfxLifetime) {
        self.collect_retired(lifetime);
        for pool in self.pools.values_mut() {
            if pool.checked_out_count() != 0 {
                panic!("pool <{}> destroyed with checked out records", pool.definition().debug_name());
            }
            pool.drain_spares(lifetime);
        }
        for slot in self.storage.values_mut() {
            if let Some(record) = slot.record.take() {
                record.tie(lifetime);
            }
        }
    }

    fn pool_of(&self, scope: ResourceScope, index: usize) -> &GfxResourcePool<D, R> {
        if scope != ResourceScope::Transient {
            panic!("only transient resources have a pool, got {:?}", scope);
        }
        let definition = self
            .transient
            .get_index(index)
            .map(|(_, definition)| definition)
            .unwrap_or_else(|| panic!("transient index {} is not registered", index));
        match self.pools.get(definition) {
            Some(pool) => pool,
            None => panic!("pool of transient #{} disappeared", index),
        }
    }
}

static NEXT_MANAGER_ID: AtomicU64 = AtomicU64::new(1);

/// 资源管理器
///
/// 负责将资源的 identity 映射到三种复用方式之一：
/// - Transient：按 definition 共享的 pool，每帧借出，帧结束后归还
/// - Storage：整个管线生命周期内唯一的持久实例
/// - External：只记录 identity 与 definition，每帧由外部填入
///
/// 每帧通过 acquire_frame_data 得到 FrameResourceTable，并且必须通过 release_frame_data 归还：
/// - 同一时刻最多只有一张 table 处于 recording，recording 结束时通过 finish_recording 交回 storage
/// - 每个 frame slot 最多有一张 table 在外，transient record 在这个 slot 的 fence 等待之后才能 release
pub struct GfxResourceManager {
    id: u64,
    images: ResourceRegistry<ImageResourceId, ImageDefinition, ImageResource>,
    buffers: ResourceRegistry<BufferResourceId, BufferDefinition, BufferResource>,

    /// 正在 recording 的 table 的序号
    recording: Option<u64>,
    /// 每个 frame slot 在外的 table 的序号
    in_flight: [Option<u64>; FrameCounter::FIF_COUNT],
    next_serial: u64,

    destroyed: bool,
}

impl Default for GfxResourceManager {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for GfxResourceManager {
    fn drop(&mut self) {
        if std::thread::panicking() {
            return;
        }
        if !self.destroyed {
            panic!("GfxResourceManager dropped without destroy");
        }
    }
}

// new & init
impl GfxResourceManager {
    pub fn new() -> Self {
        Self {
            id: NEXT_MANAGER_ID.fetch_add(1, Ordering::Relaxed),
            images: ResourceRegistry::new(),
            buffers: ResourceRegistry::new(),
            recording: None,
            in_flight: [None; FrameCounter::FIF_COUNT],
            next_serial: 0,
            destroyed: false,
        }
    }
}

// register
impl GfxResourceManager {
    fn assert_not_recording(&self, op: &str) {
        if let Some(serial) = self.recording {
            panic!("{} called while frame table #{} is recording", op, serial);
        }
    }

    fn assert_no_table(&self, op: &str) {
        self.assert_not_recording(op);
        if self.in_flight.iter().any(Option::is_some) {
            panic!("{} called while frame tables {:?} are outstanding", op, self.in_flight);
        }
    }

    fn assert_owner(&self, table: &FrameResourceTable) {
        if table.owner() != self.id {
            panic!("frame table #{} does not belong to this resource manager", table.serial());
        }
    }

    pub fn register_transient_image(&mut self, id: ImageResourceId, definition: ImageDefinition) -> GfxImageHandle {
        self.assert_not_recording("register_transient_image");
        let index = self.images.register_transient(id, definition);
        GfxImageHandle::new(ResourceScope::Transient, index)
    }

    pub fn register_external_image(&mut self, id: ImageResourceId, definition: ImageDefinition) -> GfxImageHandle {
        self.assert_not_recording("register_external_image");
        let index = self.images.register_external(id, definition);
        GfxImageHandle::new(ResourceScope::External, index)
    }

    /// record 为 None 时在第一次 acquire_frame_data 时创建
    pub fn register_storage_image(
        &mut self,
        id: ImageResourceId,
        definition: ImageDefinition,
        record: Option<ImageResource>,
    ) -> GfxImageHandle {
        self.assert_not_recording("register_storage_image");
        let index = self.images.register_storage(id, definition, record);
        GfxImageHandle::new(ResourceScope::Storage, index)
    }

    pub fn register_transient_buffer(&mut self, id: BufferResourceId, definition: BufferDefinition) -> GfxBufferHandle {
        self.assert_not_recording("register_transient_buffer");
        let index = self.buffers.register_transient(id, definition);
        GfxBufferHandle::new(ResourceScope::Transient, index)
    }

    pub fn register_external_buffer(&mut self, id: BufferResourceId, definition: BufferDefinition) -> GfxBufferHandle {
        self.assert_not_recording("register_external_buffer");
        let index = self.buffers.register_external(id, definition);
        GfxBufferHandle::new(ResourceScope::External, index)
    }

    pub fn register_storage_buffer(
        &mut self,
        id: BufferResourceId,
        definition: BufferDefinition,
        record: Option<BufferResource>,
    ) -> GfxBufferHandle {
        self.assert_not_recording("register_storage_buffer");
        let index = self.buffers.register_storage(id, definition, record);
        GfxBufferHandle::new(ResourceScope::Storage, index)
    }
}

// frame
impl GfxResourceManager {
    /// 为 frame_label 对应的 slot 组装这一帧的 FrameResourceTable
    ///
    /// transient 从 pool 中取出（pool 为空时通过 builder 创建），storage 移入 table，
    /// external 留空等待外部填入。这个 slot 上一张 table 必须已经 release。
    pub fn acquire_frame_data<B: ImageBuilder + BufferBuilder>(
        &mut self,
        frame_label: FrameLabel,
        builder: &mut B,
    ) -> FrameResourceTable {
        let _span = tracy_client::span!("GfxResourceManager::acquire_frame_data");
        self.assert_not_recording("acquire_frame_data");
        if let Some(serial) = self.in_flight[*frame_label] {
            panic!("frame slot {} still holds frame table #{}", frame_label, serial);
        }

        let images = self.images.checkout_all(|definition| builder.build_image(definition));
        let buffers = self.buffers.checkout_all(|definition| builder.build_buffer(definition));

        self.next_serial += 1;
        self.recording = Some(self.next_serial);
        self.in_flight[*frame_label] = Some(self.next_serial);
        FrameResourceTable::new(self.id, self.next_serial, frame_label, images, buffers)
    }

    /// 命令提交之后调用：storage 交回管理器供下一帧使用，transient 继续留在 table 中
    ///
    /// storage 跨帧只在同一个 queue 上使用，顺序由 barrier 保证
    pub fn finish_recording(&mut self, table: &mut FrameResourceTable) {
        self.assert_owner(table);
        if self.recording != Some(table.serial()) {
            panic!("frame table #{} is not recording, recording: {:?}", table.serial(), self.recording);
        }

        let (images, buffers) = table.end_recording();
        self.images.return_storage(images);
        self.buffers.return_storage(buffers);
        self.recording = None;
    }

    /// 归还 acquire_frame_data 得到的 table，transient 回到 pool
    ///
    /// 调用者需要保证 GPU 不会再访问这一帧的 transient 资源，也就是这个 slot 的 fence 已经被等待
    pub fn release_frame_data(&mut self, mut table: FrameResourceTable) {
        self.assert_owner(&table);
        let slot = *table.frame_label();
        if self.in_flight[slot] != Some(table.serial()) {
            panic!(
                "frame table #{} is not outstanding on slot {}, slot holds {:?}",
                table.serial(),
                table.frame_label(),
                self.in_flight[slot]
            );
        }
        if table.is_recording() {
            self.finish_recording(&mut table);
        }

        let image_bases = table.image_bases();
        let buffer_bases = table.buffer_bases();
        let (images, buffers) = table.take_records();
        self.images.checkin_all(images, image_bases);
        self.buffers.checkin_all(buffers, buffer_bases);
        self.in_flight[slot] = None;
    }

    /// 依赖 swapchain 尺寸或格式的资源：空闲的 transient record 与 storage record 交给 lifetime 销毁，
    /// storage 在下一次 acquire 时重新创建
    ///
    /// 所有 table 必须已经 release
    pub fn invalidate_swapchain_dependents(&mut self, lifetime: &mut GfxLifetime) {
        self.assert_no_table("invalidate_swapchain_dependents");
        let count = self.images.invalidate_swapchain_dependents(lifetime)
            + self.buffers.invalidate_swapchain_dependents(lifetime);
        log::info!("{} swapchain dependent resources invalidated", count);
    }

    /// 被替换掉的 storage record 交给 lifetime
    pub fn collect_retired(&mut self, lifetime: &mut GfxLifetime) {
        let count = self.images.collect_retired(lifetime) + self.buffers.collect_retired(lifetime);
        if count != 0 {
            log::debug!("{} retired resources collected", count);
        }
    }
}

// getters
impl GfxResourceManager {
    #[inline]
    pub fn image_handle(&self, id: ImageResourceId) -> Option<GfxImageHandle> {
        self.images.find(&id).map(|(scope, index)| GfxImageHandle::new(scope, index))
    }
    #[inline]
    pub fn buffer_handle(&self, id: BufferResourceId) -> Option<GfxBufferHandle> {
        self.buffers.find(&id).map(|(scope, index)| GfxBufferHandle::new(scope, index))
    }
    #[inline]
    pub fn has_outstanding_table(&self) -> bool {
        self.in_flight.iter().any(Option::is_some)
    }
    #[inline]
    pub fn is_recording(&self) -> bool {
        self.recording.is_some()
    }
    #[inline]
    pub fn outstanding_table_count(&self) -> usize {
        self.in_flight.iter().flatten().count()
    }

    #[inline]
    pub fn image_pool_count(&self) -> usize {
        self.images.pools.len()
    }
    #[inline]
    pub fn buffer_pool_count(&self) -> usize {
        self.buffers.pools.len()
    }
    #[inline]
    pub fn image_pool_spare_count(&self, handle: GfxImageHandle) -> usize {
        self.images.pool_of(handle.scope(), handle.index()).spare_count()
    }
    #[inline]
    pub fn image_pool_built_count(&self, handle: GfxImageHandle) -> usize {
        self.images.pool_of(handle.scope(), handle.index()).built_count()
    }
    #[inline]
    pub fn buffer_pool_spare_count(&self, handle: GfxBufferHandle) -> usize {
        self.buffers.pool_of(handle.scope(), handle.index()).spare_count()
    }
    #[inline]
    pub fn buffer_pool_built_count(&self, handle: GfxBufferHandle) -> usize {
        self.buffers.pool_of(handle.scope(), handle.index()).built_count()
    }
}

// destroy
impl GfxResourceManager {
    /// 所有持有的 record 交给 lifetime，调用者随后清理 lifetime
    pub fn destroy(mut self, lifetime: &mut GfxLifetime) {
        let _span = tracy_client::span!("GfxResourceManager::destroy");
        self.assert_no_table("destroy");
        self.images.destroy(lifetime);
        self.buffers.destroy(lifetime);
        self.destroyed = true;
    }
}

#[cfg(test)]
mod tests {
    use ash::vk;
    use ash::vk::Handle;

    use super::*;
    use crate::{
        frame_counter::FrameCounter,
        image_state::ImageSyncState,
        pipeline_settings::FrameLabel,
        resource_definition::{
            BufferOptionFlags, ImageFormat, ImageSize, default_buffer_definition, default_image_definition,
        },
    };

    /// 记录创建次数的 builder，创建的都是不持有内存的外部 record
    #[derive(Default)]
    struct CountingBuilder {
        images_built: usize,
        buffers_built: usize,
    }
    impl ImageBuilder for CountingBuilder {
        fn build_image(&mut self, definition: &ImageDefinition) -> ImageResource {
            self.images_built += 1;
            let raw = self.images_built as u64 * 16;
            ImageResource::from_external_image(
                vk::Image::from_raw(raw),
                vk::ImageView::from_raw(raw + 1),
                definition.usage,
                vk::Extent2D { width: 4, height: 4 },
                vk::Format::R8G8B8A8_UNORM,
                ImageSyncState::UNDEFINED,
            )
        }
    }
    impl BufferBuilder for CountingBuilder {
        fn build_buffer(&mut self, definition: &BufferDefinition) -> BufferResource {
            self.buffers_built += 1;
            BufferResource::from_external_buffer(
                vk::Buffer::from_raw(self.buffers_built as u64),
                definition.usage,
                definition.size,
            )
        }
    }

    fn color_definition(debug_name: &'static str) -> ImageDefinition {
        ImageDefinition {
            usage: vk::ImageUsageFlags::COLOR_ATTACHMENT,
            size: ImageSize::Fixed { width: 4, height: 4 },
            format: ImageFormat::Fixed(vk::Format::R8G8B8A8_UNORM),
            debug_name,
        }
    }

    fn finish(manager: GfxResourceManager) {
        let mut lifetime = GfxLifetime::new("test");
        manager.destroy(&mut lifetime);
        assert!(lifetime.is_empty());
    }

    #[test]
    fn test_idempotent_registration() {
        let mut manager = GfxResourceManager::new();
        let definition = color_definition("x");

        let a = manager.register_transient_image(ImageResourceId::Rendered, definition);
        let b = manager.register_transient_image(ImageResourceId::Rendered, definition);
        assert_eq!(a, b);
        assert_eq!(manager.image_pool_count(), 1);

        let s0 = manager.register_storage_image(ImageResourceId::ShadowMap, color_definition("s"), None);
        let s1 = manager.register_storage_image(ImageResourceId::ShadowMap, color_definition("s"), None);
        assert_eq!(s0, s1);

        let e0 = manager.register_external_image(ImageResourceId::Swapchain, color_definition("e"));
        let e1 = manager.register_external_image(ImageResourceId::Swapchain, color_definition("e"));
        assert_eq!(e0, e1);
        assert_eq!(e0.scope(), ResourceScope::External);
        assert_eq!(manager.image_handle(ImageResourceId::Swapchain), Some(e0));

        let camera = default_buffer_definition(BufferResourceId::Camera);
        let c0 = manager.register_transient_buffer(BufferResourceId::Camera, camera);
        let c1 = manager.register_transient_buffer(BufferResourceId::Camera, camera);
        assert_eq!(c0, c1);
        assert_eq!(manager.buffer_pool_count(), 1);

        finish(manager);
    }

    #[test]
    fn test_equal_definitions_share_pool() {
        let mut manager = GfxResourceManager::new();
        let a = manager.register_transient_image(ImageResourceId::GBuffer0, color_definition("gbuffer"));
        let b = manager.register_transient_image(ImageResourceId::GBuffer1, color_definition("gbuffer"));
        assert_ne!(a, b);
        assert_eq!(manager.image_pool_count(), 1);

        manager.register_transient_image(ImageResourceId::GBuffer2, color_definition("other"));
        assert_eq!(manager.image_pool_count(), 2);

        let mut builder = CountingBuilder::default();
        let table = manager.acquire_frame_data(FrameLabel::A, &mut builder);
        assert_ne!(table.get_image(a).handle(), table.get_image(b).handle());
        manager.release_frame_data(table);
        assert_eq!(manager.image_pool_spare_count(a), 2);
        assert_eq!(manager.image_pool_built_count(b), 2);

        finish(manager);
    }

    #[test]
    fn test_transient_reuse_without_second_allocation() {
        let mut manager = GfxResourceManager::new();
        let x = manager.register_transient_image(ImageResourceId::Rendered, color_definition("x"));
        let mut builder = CountingBuilder::default();

        // frame 0：pool 为空，创建 R0
        let table = manager.acquire_frame_data(FrameLabel::A, &mut builder);
        let r0 = table.get_image(x).handle();
        assert_eq!(builder.images_built, 1);
        assert_eq!(manager.image_pool_spare_count(x), 0);
        manager.release_frame_data(table);
        assert_eq!(manager.image_pool_spare_count(x), 1);

        // frame 1：取出 R0
        let table = manager.acquire_frame_data(FrameLabel::A, &mut builder);
        assert_eq!(table.get_image(x).handle(), r0);
        assert_eq!(manager.image_pool_spare_count(x), 0);
        manager.release_frame_data(table);
        assert_eq!(manager.image_pool_spare_count(x), 1);

        assert_eq!(builder.images_built, 1);
        assert_eq!(manager.image_pool_built_count(x), 1);
        finish(manager);
    }

    /// 按照渲染器的顺序推进：slot 的 fence 等待之后 release 上一轮的 table，再 acquire，提交之后 finish_recording
    #[test]
    fn test_frames_in_flight_never_share_records() {
        let mut manager = GfxResourceManager::new();
        let a = manager.register_transient_image(ImageResourceId::GBuffer0, color_definition("shared"));
        let b = manager.register_transient_image(ImageResourceId::GBuffer1, color_definition("shared"));
        let depth = manager.register_transient_image(ImageResourceId::Depth, color_definition("single"));
        let camera = manager
            .register_transient_buffer(BufferResourceId::Camera, default_buffer_definition(BufferResourceId::Camera));
        let mut builder = CountingBuilder::default();

        let mut in_flight: [Option<FrameResourceTable>; FrameCounter::FIF_COUNT] = [None, None];
        for frame_id in 0..FrameCounter::fif_count() * 4 {
            let label = FrameLabel::from_usize(frame_id % FrameCounter::fif_count());
            if let Some(table) = in_flight[*label].take() {
                manager.release_frame_data(table);
            }

            let mut table = manager.acquire_frame_data(label, &mut builder);
            let mine = [table.get_image(a).handle(), table.get_image(b).handle(), table.get_image(depth).handle()];
            let my_camera = table.get_buffer(camera).handle();
            for other in in_flight.iter().flatten() {
                for handle in [a, b, depth] {
                    assert!(!mine.contains(&other.get_image(handle).handle()));
                }
                assert_ne!(other.get_buffer(camera).handle(), my_camera);
            }

            manager.finish_recording(&mut table);
            in_flight[*label] = Some(table);
            assert_eq!(manager.outstanding_table_count(), in_flight.iter().flatten().count());
        }

        // 预热之后每个 pool 恰好收敛到 FIF_COUNT 份（共享 pool 的两个 identity 各占一份）
        assert_eq!(manager.image_pool_built_count(a), 2 * FrameCounter::fif_count());
        assert_eq!(manager.image_pool_built_count(depth), FrameCounter::fif_count());
        assert_eq!(manager.buffer_pool_built_count(camera), FrameCounter::fif_count());
        assert_eq!(builder.images_built, 3 * FrameCounter::fif_count());
        assert_eq!(manager.image_pool_spare_count(depth), 0);

        for table in in_flight.into_iter().flatten() {
            manager.release_frame_data(table);
        }
        assert_eq!(manager.image_pool_spare_count(depth), FrameCounter::fif_count());
        assert_eq!(manager.image_pool_spare_count(a), 2 * FrameCounter::fif_count());
        finish(manager);
    }

    #[test]
    fn test_storage_shared_by_frames_in_flight() {
        let mut manager = GfxResourceManager::new();
        let shadow = manager.register_storage_image(
            ImageResourceId::ShadowMap,
            default_image_definition(ImageResourceId::ShadowMap),
            None,
        );
        let mut builder = CountingBuilder::default();

        let mut frame_a = manager.acquire_frame_data(FrameLabel::A, &mut builder);
        let image = frame_a.get_image(shadow).handle();
        frame_a.get_image_mut(shadow).prepare_barrier(ImageSyncState::LATE_DEPTH);
        manager.finish_recording(&mut frame_a);
        assert!(!frame_a.is_image_filled(shadow));

        // slot A 仍在 GPU 上，slot B 拿到同一个 storage 以及它的同步状态
        let mut frame_b = manager.acquire_frame_data(FrameLabel::B, &mut builder);
        assert_eq!(frame_b.get_image(shadow).handle(), image);
        assert_eq!(frame_b.get_image(shadow).sync_state(), ImageSyncState::LATE_DEPTH);
        frame_b.get_image_mut(shadow).prepare_barrier(ImageSyncState::FRAGMENT_SHADER_READ_ONLY);
        manager.finish_recording(&mut frame_b);

        manager.release_frame_data(frame_a);
        let frame_a = manager.acquire_frame_data(FrameLabel::A, &mut builder);
        assert_eq!(frame_a.get_image(shadow).sync_state(), ImageSyncState::FRAGMENT_SHADER_READ_ONLY);
        manager.release_frame_data(frame_a);
        manager.release_frame_data(frame_b);

        assert_eq!(builder.images_built, 1);
        finish(manager);
    }

    #[test]
    fn test_register_between_frames_in_flight() {
        let mut manager = GfxResourceManager::new();
        let rendered = manager.register_transient_image(ImageResourceId::Rendered, color_definition("rendered"));
        let mut builder = CountingBuilder::default();

        let mut frame_a = manager.acquire_frame_data(FrameLabel::A, &mut builder);
        manager.finish_recording(&mut frame_a);

        let depth = manager.register_transient_image(ImageResourceId::Depth, color_definition("depth"));
        let shadow = manager.register_storage_image(ImageResourceId::ShadowMap, color_definition("shadow"), None);
        let frame_b = manager.acquire_frame_data(FrameLabel::B, &mut builder);
        assert!(frame_b.is_image_filled(depth));
        assert!(frame_b.is_image_filled(shadow));

        // frame_a 只知道 rendered
        manager.release_frame_data(frame_a);
        manager.release_frame_data(frame_b);
        assert_eq!(manager.image_pool_spare_count(rendered), 2);
        assert_eq!(manager.image_pool_spare_count(depth), 1);
        finish(manager);
    }

    #[test]
    #[should_panic(expected = "still holds frame table")]
    fn test_slot_reused_before_release() {
        let mut manager = GfxResourceManager::new();
        let mut builder = CountingBuilder::default();
        let mut table = manager.acquire_frame_data(FrameLabel::A, &mut builder);
        manager.finish_recording(&mut table);
        manager.acquire_frame_data(FrameLabel::A, &mut builder);
    }

    #[test]
    #[should_panic(expected = "is recording")]
    fn test_acquire_while_recording() {
        let mut manager = GfxResourceManager::new();
        let mut builder = CountingBuilder::default();
        let _recording = manager.acquire_frame_data(FrameLabel::A, &mut builder);
        manager.acquire_frame_data(FrameLabel::B, &mut builder);
    }

    #[test]
    #[should_panic(expected = "are outstanding")]
    fn test_invalidate_with_frame_in_flight() {
        let mut manager = GfxResourceManager::new();
        let mut table = manager.acquire_frame_data(FrameLabel::A, &mut CountingBuilder::default());
        manager.finish_recording(&mut table);
        manager.invalidate_swapchain_dependents(&mut GfxLifetime::new("stale"));
    }

    #[test]
    fn test_storage_persists_and_keeps_sync_state() {
        let mut manager = GfxResourceManager::new();
        let shadow = manager.register_storage_image(
            ImageResourceId::ShadowMap,
            default_image_definition(ImageResourceId::ShadowMap),
            None,
        );
        let camera = manager.register_storage_buffer(
            BufferResourceId::Camera,
            BufferDefinition {
                flags: BufferOptionFlags::empty(),
                ..default_buffer_definition(BufferResourceId::Camera)
            },
            None,
        );
        let mut builder = CountingBuilder::default();

        let mut table = manager.acquire_frame_data(FrameLabel::A, &mut builder);
        let first = table.get_image(shadow).handle();
        table.get_image_mut(shadow).prepare_barrier(ImageSyncState::LATE_DEPTH);
        let camera_buffer = table.get_buffer(camera).handle();
        manager.release_frame_data(table);

        let table = manager.acquire_frame_data(FrameLabel::A, &mut builder);
        assert_eq!(table.get_image(shadow).handle(), first);
        assert_eq!(table.get_image(shadow).sync_state(), ImageSyncState::LATE_DEPTH);
        assert_eq!(table.get_buffer(camera).handle(), camera_buffer);
        manager.release_frame_data(table);

        assert_eq!(builder.images_built, 1);
        assert_eq!(builder.buffers_built, 1);
        finish(manager);
    }

    #[test]
    fn test_storage_with_initial_record() {
        let mut manager = GfxResourceManager::new();
        let record = BufferResource::from_external_buffer(vk::Buffer::from_raw(99), vk::BufferUsageFlags::UNIFORM_BUFFER, 16);
        let handle = manager.register_storage_buffer(
            BufferResourceId::ShadowCamera,
            default_buffer_definition(BufferResourceId::ShadowCamera),
            Some(record),
        );
        let mut builder = CountingBuilder::default();

        let table = manager.acquire_frame_data(FrameLabel::A, &mut builder);
        assert_eq!(table.get_buffer(handle).handle(), vk::Buffer::from_raw(99));
        manager.release_frame_data(table);
        assert_eq!(builder.buffers_built, 0);
        finish(manager);
    }

    #[test]
    fn test_invalidate_swapchain_dependents() {
        let mut manager = GfxResourceManager::new();
        let rendered = manager.register_transient_image(
            ImageResourceId::Rendered,
            default_image_definition(ImageResourceId::Rendered),
        );
        let fixed = manager.register_transient_image(ImageResourceId::GBuffer3, color_definition("fixed"));
        let depth =
            manager.register_storage_image(ImageResourceId::Depth, default_image_definition(ImageResourceId::Depth), None);
        let mut builder = CountingBuilder::default();

        let table = manager.acquire_frame_data(FrameLabel::A, &mut builder);
        manager.release_frame_data(table);
        assert_eq!(builder.images_built, 3);

        let mut lifetime = GfxLifetime::new("swapchain");
        manager.invalidate_swapchain_dependents(&mut lifetime);
        assert_eq!(manager.image_pool_spare_count(rendered), 0);
        assert_eq!(manager.image_pool_spare_count(fixed), 1);

        // rendered 与 depth 重新创建，fixed 复用
        let table = manager.acquire_frame_data(FrameLabel::A, &mut builder);
        assert!(table.is_image_filled(depth));
        manager.release_frame_data(table);
        assert_eq!(builder.images_built, 5);
        finish(manager);
    }

    #[test]
    fn test_fill_external_each_frame() {
        let mut manager = GfxResourceManager::new();
        let swapchain = manager.register_external_image(
            ImageResourceId::Swapchain,
            default_image_definition(ImageResourceId::Swapchain),
        );
        let mut builder = CountingBuilder::default();

        let mut table = manager.acquire_frame_data(FrameLabel::A, &mut builder);
        table.set_external_image(
            swapchain,
            ImageResource::from_external_image(
                vk::Image::from_raw(5),
                vk::ImageView::from_raw(6),
                vk::ImageUsageFlags::COLOR_ATTACHMENT,
                vk::Extent2D { width: 4, height: 4 },
                vk::Format::B8G8R8A8_SRGB,
                ImageSyncState::UNDEFINED,
            ),
        );
        assert_eq!(table.get_image(swapchain).handle(), vk::Image::from_raw(5));
        manager.release_frame_data(table);

        let table = manager.acquire_frame_data(FrameLabel::A, &mut builder);
        assert!(!table.is_image_filled(swapchain));
        manager.release_frame_data(table);
        assert_eq!(builder.images_built, 0);
        finish(manager);
    }

    #[test]
    #[should_panic(expected = "is not filled")]
    fn test_unfilled_external_is_fatal() {
        let mut manager = GfxResourceManager::new();
        let swapchain = manager.register_external_image(
            ImageResourceId::Swapchain,
            default_image_definition(ImageResourceId::Swapchain),
        );
        let table = manager.acquire_frame_data(FrameLabel::A, &mut CountingBuilder::default());
        table.get_image(swapchain);
    }

    #[test]
    #[should_panic(expected = "does not belong")]
    fn test_release_foreign_table() {
        let mut a = GfxResourceManager::new();
        let mut b = GfxResourceManager::new();
        let table = a.acquire_frame_data(FrameLabel::A, &mut CountingBuilder::default());
        b.release_frame_data(table);
    }

    #[test]
    #[should_panic(expected = "different definition")]
    fn test_register_with_different_definition() {
        let mut manager = GfxResourceManager::new();
        manager.register_transient_image(ImageResourceId::Rendered, color_definition("a"));
        manager.register_transient_image(ImageResourceId::Rendered, color_definition("b"));
    }

    #[test]
    #[should_panic(expected = "can not register as")]
    fn test_register_in_two_scopes() {
        let mut manager = GfxResourceManager::new();
        manager.register_transient_image(ImageResourceId::Depth, color_definition("a"));
        manager.register_external_image(ImageResourceId::Depth, color_definition("a"));
    }

    #[test]
    #[should_panic(expected = "is recording")]
    fn test_register_while_recording() {
        let mut manager = GfxResourceManager::new();
        let _table = manager.acquire_frame_data(FrameLabel::A, &mut CountingBuilder::default());
        manager.register_transient_image(ImageResourceId::Rendered, color_definition("late"));
    }

    #[test]
    #[should_panic(expected = "without destroy")]
    fn test_drop_without_destroy() {
        drop(GfxResourceManager::new());
    }
}
