use std::ffi::{CStr, CString, c_char};

use anyhow::Context;
use ash::vk;
use itertools::Itertools;

use crate::{
    foundation::debug_messenger::GfxDebugMsger,
    lifetime::{deletion_stack::GfxDestroyer, entries::InstanceEntry},
};

const VALIDATION_LAYER: &CStr = c"VK_LAYER_KHRONOS_validation";

/// vk instance 以及 instance 级别的扩展函数指针
pub struct GfxInstance {
    /// 在 drop 之后，会卸载 dll，因此需要确保该字段最后 drop
    pub(crate) vk_entry: ash::Entry,
    pub(crate) ash_instance: ash::Instance,

    pub(crate) surface_pf: ash::khr::surface::Instance,
    /// 只有开启 validation 时才会加载
    pub(crate) debug_utils_pf: Option<ash::ext::debug_utils::Instance>,
}

// new & init
impl GfxInstance {
    /// 设置所需的 layers 和 extensions，创建 vk instance
    pub fn new(
        app_name: &str,
        raw_display_handle: raw_window_handle::RawDisplayHandle,
        enable_validation: bool,
    ) -> anyhow::Result<Self> {
        let vk_entry = unsafe { ash::Entry::load() }.context("failed to load vulkan entry")?;

        let app_name = CString::new(app_name).context("app name contains nul")?;
        let app_info = vk::ApplicationInfo::default()
            .api_version(vk::API_VERSION_1_3) // 版本过低时，有些函数无法正确加载
            .application_name(app_name.as_c_str())
            .application_version(vk::make_api_version(0, 1, 0, 0))
            .engine_name(c"Truvis")
            .engine_version(vk::make_api_version(0, 1, 0, 0));

        let enabled_extensions = Self::get_extensions(&vk_entry, raw_display_handle, enable_validation)?;
        log::info!(
            "instance extensions: {}",
            enabled_extensions.iter().map(|ext| format!("\n\t{:?}", unsafe { CStr::from_ptr(*ext) })).join("")
        );

        let enabled_layers = Self::get_layers(&vk_entry, enable_validation)?;
        log::info!(
            "instance layers: {}",
            enabled_layers.iter().map(|layer| format!("\n\t{:?}", unsafe { CStr::from_ptr(*layer) })).join("")
        );

        let mut instance_ci = vk::InstanceCreateInfo::default()
            .application_info(&app_info)
            .enabled_extension_names(&enabled_extensions)
            .enabled_layer_names(&enabled_layers);

        // 为 instance info 添加 debug messenger，用于捕获 instance 创建过程中的消息
        let mut debug_utils_messenger_ci = GfxDebugMsger::debug_utils_messenger_ci();
        if enable_validation {
            instance_ci = instance_ci.push_next(&mut debug_utils_messenger_ci);
        }

        let ash_instance =
            unsafe { vk_entry.create_instance(&instance_ci, None) }.context("failed to create vk instance")?;

        let surface_pf = ash::khr::surface::Instance::new(&vk_entry, &ash_instance);
        let debug_utils_pf =
            enable_validation.then(|| ash::ext::debug_utils::Instance::new(&vk_entry, &ash_instance));

        Ok(Self {
            vk_entry,
            ash_instance,
            surface_pf,
            debug_utils_pf,
        })
    }

    /// instance 所需的所有 extension：窗口系统需要的 surface 扩展，以及可选的 debug utils
    fn get_extensions(
        vk_entry: &ash::Entry,
        raw_display_handle: raw_window_handle::RawDisplayHandle,
        enable_validation: bool,
    ) -> anyhow::Result<Vec<*const c_char>> {
        let mut exts = ash_window::enumerate_required_extensions(raw_display_handle)
            .context("failed to query surface extensions of the window system")?
            .to_vec();

        if enable_validation {
            // 这个 extension 可以单独使用，提供以下功能：
            // 1. debug messenger
            // 2. 为 vulkan object 设置 debug name
            // 3. 使用 label 标记 queue 或者 command buffer 中的一个一个 section
            exts.push(vk::EXT_DEBUG_UTILS_NAME.as_ptr());
        }

        let all_ext_props = unsafe { vk_entry.enumerate_instance_extension_properties(None) }
            .context("failed to enumerate instance extensions")?;
        for ext in &exts {
            let ext = unsafe { CStr::from_ptr(*ext) };
            let supported = all_ext_props.iter().any(|props| props.extension_name_as_c_str() == Ok(ext));
            anyhow::ensure!(supported, "required instance extension {:?} is missing", ext);
        }

        Ok(exts)
    }

    /// validation layer 不可用时只给出警告，不影响运行
    fn get_layers(vk_entry: &ash::Entry, enable_validation: bool) -> anyhow::Result<Vec<*const c_char>> {
        if !enable_validation {
            return Ok(Vec::new());
        }

        let all_layer_props = unsafe { vk_entry.enumerate_instance_layer_properties() }
            .context("failed to enumerate instance layers")?;
        let supported = all_layer_props.iter().any(|props| props.layer_name_as_c_str() == Ok(VALIDATION_LAYER));
        if supported {
            Ok(vec![VALIDATION_LAYER.as_ptr()])
        } else {
            log::warn!("validation layer {:?} is not available, continue without it", VALIDATION_LAYER);
            Ok(Vec::new())
        }
    }
}

// getters
impl GfxInstance {
    #[inline]
    pub fn vk_entry(&self) -> &ash::Entry {
        &self.vk_entry
    }

    #[inline]
    pub fn ash_instance(&self) -> &ash::Instance {
        &self.ash_instance
    }

    #[inline]
    pub fn surface_pf(&self) -> &ash::khr::surface::Instance {
        &self.surface_pf
    }

    #[inline]
    pub fn debug_utils_pf(&self) -> Option<&ash::ext::debug_utils::Instance> {
        self.debug_utils_pf.as_ref()
    }
}

// destroy
impl GfxInstance {
    /// instance 作用域内的对象必须已经全部销毁
    pub fn destroy(self) {
        log::info!("destroying GfxInstance");
        unsafe {
            self.ash_instance.destroy_instance(None);
        }
    }
}

impl GfxDestroyer<InstanceEntry> for GfxInstance {
    fn destroy_entry(&self, entry: InstanceEntry) {
        log::debug!("destroy instance entry: {}", entry.kind_name());
        unsafe {
            match entry {
                InstanceEntry::Device(device) => device.destroy_device(None),
                InstanceEntry::Surface(surface) => self.surface_pf.destroy_surface(surface, None),
                InstanceEntry::DebugMessenger(messenger) => match &self.debug_utils_pf {
                    Some(pf) => pf.destroy_debug_utils_messenger(messenger, None),
                    None => log::error!("debug messenger registered without debug utils loaded"),
                },
            }
        }
    }
}
