use truvis_gfx::lifetime::lifetime::GfxLifetime;

use crate::{
    buffer_resource::BufferResource, gfx_resource_manager::ResourceDefinition, image_resource::ImageResource,
};

/// 可以被 tie 到 lifetime 的物理记录
pub trait PooledResource {
    fn tie(self, lifetime: &mut GfxLifetime);
}
impl PooledResource for ImageResource {
    #[inline]
    fn tie(self, lifetime: &mut GfxLifetime) {
        ImageResource::tie(self, lifetime)
    }
}
impl PooledResource for BufferResource {
    #[inline]
    fn tie(self, lifetime: &mut GfxLifetime) {
        BufferResource::tie(self, lifetime)
    }
}

/// 同一个 definition 的一组 transient 记录
///
/// spares 是一个栈：最近归还的记录最先被取出。
/// pool 只会增长，除非显式地 drain。
pub struct GfxResourcePool<D, R> {
    definition: D,
    spares: Vec<R>,
    /// 当前被借出的数量
    checked_out: usize,
    /// 累计创建的数量
    built: usize,
}

// new & init
impl<D, R> GfxResourcePool<D, R> {
    pub fn new(definition: D) -> Self {
        Self {
            definition,
            spares: Vec::new(),
            checked_out: 0,
            built: 0,
        }
    }
}

// getters
impl<D, R> GfxResourcePool<D, R> {
    #[inline]
    pub fn definition(&self) -> &D {
        &self.definition
    }
    #[inline]
    pub fn spare_count(&self) -> usize {
        self.spares.len()
    }
    #[inline]
    pub fn checked_out_count(&self) -> usize {
        self.checked_out
    }
    #[inline]
    pub fn built_count(&self) -> usize {
        self.built
    }
}

// tools
impl<D: ResourceDefinition, R: PooledResource> GfxResourcePool<D, R> {
    /// 取出最近归还的记录，pool 为空时通过 build 创建一个新的
    pub fn checkout(&mut self, build: impl FnOnce(&D) -> R) -> R {
        self.checked_out += 1;
        match self.spares.pop() {
            Some(record) => record,
            None => {
                self.built += 1;
                log::debug!("pool <{}> grows to {} records", self.definition.debug_name(), self.built);
                build(&self.definition)
            }
        }
    }

    pub fn checkin(&mut self, record: R) {
        if self.checked_out == 0 {
            panic!("pool received a record that was never checked out");
        }
        self.checked_out -= 1;
        self.spares.push(record);
    }

    /// 将所有空闲记录交给 lifetime 销毁，返回销毁的数量
    pub fn drain_spares(&mut self, lifetime: &mut GfxLifetime) -> usize {
        let count = self.spares.len();
        for record in self.spares.drain(..).rev() {
            record.tie(lifetime);
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use ash::vk;
    use ash::vk::Handle;

    use super::*;
    use crate::resource_definition::{BufferDefinition, BufferResourceId, default_buffer_definition};

    fn camera() -> BufferDefinition {
        default_buffer_definition(BufferResourceId::Camera)
    }

    fn buffer(raw: u64) -> BufferResource {
        BufferResource::from_external_buffer(vk::Buffer::from_raw(raw), vk::BufferUsageFlags::UNIFORM_BUFFER, 64)
    }

    #[test]
    fn test_most_recently_returned_first() {
        let mut pool = GfxResourcePool::<BufferDefinition, BufferResource>::new(camera());
        let a = pool.checkout(|_| buffer(1));
        let b = pool.checkout(|_| buffer(2));
        assert_eq!(pool.built_count(), 2);
        assert_eq!(pool.checked_out_count(), 2);

        pool.checkin(a);
        pool.checkin(b);
        assert_eq!(pool.spare_count(), 2);

        let c = pool.checkout(|_| unreachable!("pool has spares"));
        assert_eq!(c.handle(), vk::Buffer::from_raw(2));
        pool.checkin(c);
        assert_eq!(pool.built_count(), 2);
    }

    #[test]
    fn test_drain_spares() {
        let mut pool = GfxResourcePool::<BufferDefinition, BufferResource>::new(camera());
        let a = pool.checkout(|_| buffer(1));
        pool.checkin(a);

        let mut lifetime = GfxLifetime::new("test");
        assert_eq!(pool.drain_spares(&mut lifetime), 1);
        assert_eq!(pool.spare_count(), 0);
        // 外部记录不会 tie 任何东西
        assert!(lifetime.is_empty());
    }

    #[test]
    #[should_panic(expected = "never checked out")]
    fn test_checkin_without_checkout() {
        let mut pool = GfxResourcePool::<BufferDefinition, BufferResource>::new(camera());
        pool.checkin(buffer(1));
    }
}
