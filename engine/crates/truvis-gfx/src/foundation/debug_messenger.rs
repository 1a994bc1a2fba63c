use std::ffi::CStr;

use anyhow::Context;
use ash::vk;

/// validation layer 的消息转发到 log
pub struct GfxDebugMsger;

impl GfxDebugMsger {
    const DEBUG_MSG_TYPE: vk::DebugUtilsMessageTypeFlagsEXT = vk::DebugUtilsMessageTypeFlagsEXT::from_raw(
        vk::DebugUtilsMessageTypeFlagsEXT::GENERAL.as_raw()
            | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION.as_raw()
            | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE.as_raw(),
    );

    const DEBUG_MSG_SEVERITY: vk::DebugUtilsMessageSeverityFlagsEXT = vk::DebugUtilsMessageSeverityFlagsEXT::from_raw(
        vk::DebugUtilsMessageSeverityFlagsEXT::WARNING.as_raw() | vk::DebugUtilsMessageSeverityFlagsEXT::ERROR.as_raw(),
    );

    /// 创建 debug messenger，返回的 handle 需要登记到 instance 作用域
    pub fn create(loader: &ash::ext::debug_utils::Instance) -> anyhow::Result<vk::DebugUtilsMessengerEXT> {
        let create_info = Self::debug_utils_messenger_ci();
        let messenger = unsafe { loader.create_debug_utils_messenger(&create_info, None) }
            .context("failed to create debug utils messenger")?;
        Ok(messenger)
    }

    /// 用于创建 debug messenger 的结构体，也会挂到 instance 的 create info 上
    pub fn debug_utils_messenger_ci() -> vk::DebugUtilsMessengerCreateInfoEXT<'static> {
        vk::DebugUtilsMessengerCreateInfoEXT::default()
            .message_severity(Self::DEBUG_MSG_SEVERITY)
            .message_type(Self::DEBUG_MSG_TYPE)
            .pfn_user_callback(Some(vk_debug_callback))
    }
}

/// debug messenger 的回调函数
/// # Safety
unsafe extern "system" fn vk_debug_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    p_callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT,
    _user_data: *mut std::os::raw::c_void,
) -> vk::Bool32 {
    let callback_data = unsafe { *p_callback_data };

    let msg = if callback_data.p_message.is_null() {
        std::borrow::Cow::from("")
    } else {
        unsafe { CStr::from_ptr(callback_data.p_message).to_string_lossy() }
    };

    let format_msg = format!("[{:?}]\n{}", message_type, format_validation_message(msg.as_ref()));

    match message_severity {
        vk::DebugUtilsMessageSeverityFlagsEXT::ERROR => log::error!("{}", format_msg),
        vk::DebugUtilsMessageSeverityFlagsEXT::WARNING => log::warn!("{}", format_msg),
        vk::DebugUtilsMessageSeverityFlagsEXT::INFO => log::info!("{}", format_msg),
        _ => log::debug!("{}", format_msg),
    };

    // 只有 layer developer 才需要返回 True
    vk::FALSE
}

/// 部分 layer 输出的是 json：MainMessage 里面有换行符，单独输出；其余字段格式化后输出
fn format_validation_message(msg: &str) -> String {
    let mut json_value = serde_json::from_str::<serde_json::Value>(msg);
    let Some(json_obj) = json_value.as_mut().ok().and_then(|v| v.as_object_mut()) else {
        return msg.to_string();
    };

    let main_msg = json_obj.remove("MainMessage");
    let main_msg_str = main_msg.as_ref().and_then(|value| value.as_str()).unwrap_or_default();
    let total_msg_str = serde_json::to_string_pretty(&json_obj).unwrap_or_else(|_| msg.to_string());

    format!("{}\n{}\n", total_msg_str, main_msg_str)
}

/// 可以设置 debug name 的 vulkan 对象
pub trait DebugType {
    fn debug_type_name() -> &'static str;
    fn vk_handle(&self) -> impl vk::Handle + Copy;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_message_kept() {
        assert_eq!(format_validation_message("vkCreateDevice: ok"), "vkCreateDevice: ok");
    }

    #[test]
    fn test_json_message_split() {
        let formatted = format_validation_message(r#"{"MainMessage":"line1\nline2","MessageID":42}"#);
        assert!(formatted.contains("\"MessageID\": 42"));
        assert!(formatted.ends_with("line1\nline2\n"));
        assert!(!formatted.contains("MainMessage"));
    }

    struct Named(vk::Fence);
    impl DebugType for Named {
        fn debug_type_name() -> &'static str {
            "Named"
        }
        fn vk_handle(&self) -> impl vk::Handle + Copy {
            self.0
        }
    }

    /// set_object_debug_name 按值接收 handle，handle 需要能够复制
    fn raw_twice<T: DebugType>(object: &T) -> (u64, u64) {
        use ash::vk::Handle;
        let handle = object.vk_handle();
        let copied = handle;
        (handle.as_raw(), copied.as_raw())
    }

    #[test]
    fn test_debug_handle_is_copy() {
        use ash::vk::Handle;
        assert_eq!(raw_twice(&Named(vk::Fence::from_raw(42))), (42, 42));
    }
}
