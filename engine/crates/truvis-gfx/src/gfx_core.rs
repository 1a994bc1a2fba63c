use crate::{
    commands::command_queue::GfxCommandQueue,
    foundation::{
        debug_messenger::GfxDebugMsger, device::GfxDevice, instance::GfxInstance, mem_allocator::GfxMemAllocator,
        physical_device::GfxPhysicalDevice,
    },
    lifetime::{deletion_stack::GfxDeletionStack, entries::InstanceEntry},
    swapchain::surface::GfxSurface,
};

/// 设备层的核心对象
///
/// 创建顺序：instance -> debug messenger -> surface -> physical device -> device -> allocator。
/// messenger、surface、device 登记在 instance 作用域的删除栈上，销毁时按照 LIFO 的顺序进行。
///
/// 所有对象通过参数显式传递，不存在全局单例。
pub struct GfxCore {
    pub(crate) instance: GfxInstance,
    pub(crate) physical_device: GfxPhysicalDevice,
    pub(crate) device: GfxDevice,
    pub(crate) allocator: GfxMemAllocator,
    pub(crate) surface: GfxSurface,

    pub(crate) gfx_queue: GfxCommandQueue,

    /// device, surface, debug messenger
    instance_stack: GfxDeletionStack<InstanceEntry>,
}

/// instance 之后创建的各个对象，用于在失败时统一回滚
struct GfxCoreParts {
    physical_device: GfxPhysicalDevice,
    device: GfxDevice,
    allocator: GfxMemAllocator,
    surface: GfxSurface,
}

// 创建与销毁
impl GfxCore {
    pub fn new(
        app_name: &str,
        raw_display_handle: raw_window_handle::RawDisplayHandle,
        raw_window_handle: raw_window_handle::RawWindowHandle,
        enable_validation: bool,
    ) -> anyhow::Result<Self> {
        let _span = tracy_client::span!("GfxCore::new");

        let instance = GfxInstance::new(app_name, raw_display_handle, enable_validation)?;
        let mut instance_stack = GfxDeletionStack::new("instance");

        let parts = match Self::init_parts(&instance, &mut instance_stack, raw_display_handle, raw_window_handle) {
            Ok(parts) => parts,
            Err(e) => {
                // 已经创建的对象按照 LIFO 回滚，然后销毁 instance
                log::error!("failed to init gfx core: {:#}", e);
                instance_stack.cleanup(&instance);
                instance.destroy();
                return Err(e);
            }
        };

        let gfx_queue = GfxCommandQueue::new_gfx_queue(&parts.device);
        parts.device.set_object_debug_name(instance.ash_instance().handle(), "GfxInstance");
        parts.device.set_debug_name(&parts.physical_device, "main");
        parts.device.set_debug_name(&parts.device, "main");
        parts.device.set_debug_name(&parts.surface, "main");

        Ok(Self {
            instance,
            physical_device: parts.physical_device,
            device: parts.device,
            allocator: parts.allocator,
            surface: parts.surface,
            gfx_queue,
            instance_stack,
        })
    }

    fn init_parts(
        instance: &GfxInstance,
        instance_stack: &mut GfxDeletionStack<InstanceEntry>,
        raw_display_handle: raw_window_handle::RawDisplayHandle,
        raw_window_handle: raw_window_handle::RawWindowHandle,
    ) -> anyhow::Result<GfxCoreParts> {
        if let Some(debug_utils_pf) = instance.debug_utils_pf() {
            let messenger = GfxDebugMsger::create(debug_utils_pf)?;
            instance_stack.defer(InstanceEntry::DebugMessenger(messenger));
        }

        let surface = GfxSurface::new(instance, raw_display_handle, raw_window_handle)?;
        instance_stack.defer(InstanceEntry::Surface(surface.handle()));

        let physical_device = GfxPhysicalDevice::new_descrete_physical_device(instance, surface.handle())?;

        let device = GfxDevice::new(instance, &physical_device)?;
        instance_stack.defer(InstanceEntry::Device(device.ash_device().clone()));

        let allocator = GfxMemAllocator::new(instance, &physical_device, &device)?;

        Ok(GfxCoreParts {
            physical_device,
            device,
            allocator,
            surface,
        })
    }

    /// 所有 device 作用域以及 allocator 作用域的对象必须已经销毁
    pub fn destroy(self) {
        let Self {
            instance,
            device,
            allocator,
            mut instance_stack,
            ..
        } = self;

        device.wait_idle();
        allocator.destroy();
        instance_stack.cleanup(&instance);
        instance.destroy();
    }
}

// getters
impl GfxCore {
    #[inline]
    pub fn instance(&self) -> &GfxInstance {
        &self.instance
    }
    #[inline]
    pub fn physical_device(&self) -> &GfxPhysicalDevice {
        &self.physical_device
    }
    #[inline]
    pub fn device(&self) -> &GfxDevice {
        &self.device
    }
    #[inline]
    pub fn allocator(&self) -> &GfxMemAllocator {
        &self.allocator
    }
    #[inline]
    pub fn surface(&self) -> &GfxSurface {
        &self.surface
    }
    #[inline]
    pub fn gfx_queue(&self) -> &GfxCommandQueue {
        &self.gfx_queue
    }
}
