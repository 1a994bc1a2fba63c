use std::fmt::{Debug, Formatter};

/// 资源的复用方式
///
/// - Transient：每帧从 pool 中取出一个实例，帧结束后归还；pool 按需增长，不会自动收缩
/// - Storage：整个管线生命周期内只有一个持久实例，跨帧保留内容与同步状态
/// - External：由外部协作者持有并在每帧填入，这里只记录 identity 与 definition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceScope {
    Transient,
    Storage,
    External,
}

macro_rules! define_resource_handle {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name {
            scope: ResourceScope,
            index: u32,
        }

        impl $name {
            #[inline]
            pub(crate) fn new(scope: ResourceScope, index: usize) -> Self {
                Self {
                    scope,
                    index: index as u32,
                }
            }

            #[inline]
            pub fn scope(&self) -> ResourceScope {
                self.scope
            }

            /// 在所属 scope 的 identity 表中的序号
            #[inline]
            pub fn index(&self) -> usize {
                self.index as usize
            }
        }

        impl Debug for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}({:?}#{})", $label, self.scope, self.index)
            }
        }
    };
}

define_resource_handle!(
    /// image identity 的句柄，只在一次 acquire 得到的 FrameResourceTable 内有意义
    GfxImageHandle,
    "ImageHandle"
);
define_resource_handle!(
    /// buffer identity 的句柄，只在一次 acquire 得到的 FrameResourceTable 内有意义
    GfxBufferHandle,
    "BufferHandle"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_debug_and_eq() {
        let a = GfxImageHandle::new(ResourceScope::Storage, 3);
        let b = GfxImageHandle::new(ResourceScope::Storage, 3);
        let c = GfxImageHandle::new(ResourceScope::Transient, 3);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(format!("{a:?}"), "ImageHandle(Storage#3)");
        assert_eq!(GfxBufferHandle::new(ResourceScope::External, 0).index(), 0);
    }
}
