/// 负责真正销毁某一类 entry 的对象
///
/// - instance 销毁 `InstanceEntry`
/// - device 销毁 `DeviceEntry`
/// - allocator 销毁 `AllocatorEntry`
///
/// 每个实现内部用一个 match 分派到对应的 vkDestroy 调用。
pub trait GfxDestroyer<E> {
    fn destroy_entry(&self, entry: E);
}

/// 作用域化的延迟销毁栈
///
/// 对象创建之后立刻 `defer` 到某个作用域的栈上，作用域结束时 `cleanup` 按照 LIFO 的顺序销毁。
/// 后创建的对象可能依赖先创建的对象（例如 view 依赖 image），因此必须逆序销毁。
///
/// 栈在 drop 时必须为空，否则说明有对象泄漏，直接 panic。
pub struct GfxDeletionStack<E> {
    scope: &'static str,
    entries: Vec<E>,
}

// new & init
impl<E> GfxDeletionStack<E> {
    pub fn new(scope: &'static str) -> Self {
        Self {
            scope,
            entries: Vec::new(),
        }
    }
}

// getters
impl<E> GfxDeletionStack<E> {
    #[inline]
    pub fn scope(&self) -> &'static str {
        self.scope
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// tools
impl<E> GfxDeletionStack<E> {
    /// 将一个对象登记到当前作用域
    #[inline]
    pub fn defer(&mut self, entry: E) {
        self.entries.push(entry);
    }

    /// 按照 LIFO 的顺序销毁所有已登记的对象，结束后栈为空，可以继续复用
    pub fn cleanup<D: GfxDestroyer<E>>(&mut self, destroyer: &D) {
        if self.entries.is_empty() {
            return;
        }
        log::debug!("cleanup deletion stack <{}>: {} entries", self.scope, self.entries.len());

        while let Some(entry) = self.entries.pop() {
            destroyer.destroy_entry(entry);
        }
    }
}

impl<E> Drop for GfxDeletionStack<E> {
    fn drop(&mut self) {
        // 已经在 unwind 的过程中，不再二次 panic
        if std::thread::panicking() {
            return;
        }
        assert!(
            self.entries.is_empty(),
            "deletion stack <{}> dropped with {} pending entries",
            self.scope,
            self.entries.len()
        );
    }
}
