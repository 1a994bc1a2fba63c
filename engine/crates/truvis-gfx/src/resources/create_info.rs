use ash::vk;

pub struct GfxImageCreateInfo {
    inner: vk::ImageCreateInfo<'static>,
}
impl GfxImageCreateInfo {
    #[inline]
    pub fn new_image_2d_info(extent: vk::Extent2D, format: vk::Format, usage: vk::ImageUsageFlags) -> Self {
        Self {
            inner: vk::ImageCreateInfo {
                image_type: vk::ImageType::TYPE_2D,
                format,
                extent: extent.into(),
                mip_levels: 1,
                array_layers: 1,
                samples: vk::SampleCountFlags::TYPE_1,
                tiling: vk::ImageTiling::OPTIMAL,
                usage,
                sharing_mode: vk::SharingMode::EXCLUSIVE,
                // Vulkan 规定初始 layout 只能是 UNDEFINED 或者 PREINITIALIZED
                initial_layout: vk::ImageLayout::UNDEFINED,
                ..Default::default()
            },
        }
    }

    #[inline]
    pub fn as_info(&self) -> &vk::ImageCreateInfo<'static> {
        &self.inner
    }
}

pub struct GfxImageViewCreateInfo {
    inner: vk::ImageViewCreateInfo<'static>,
}
impl GfxImageViewCreateInfo {
    /// 单个 mip、单个 layer 的 2D view
    #[inline]
    pub fn new_image_view_2d_info(image: vk::Image, format: vk::Format, aspect_mask: vk::ImageAspectFlags) -> Self {
        Self {
            inner: vk::ImageViewCreateInfo {
                image,
                view_type: vk::ImageViewType::TYPE_2D,
                format,
                subresource_range: vk::ImageSubresourceRange {
                    aspect_mask,
                    base_mip_level: 0,
                    level_count: 1,
                    base_array_layer: 0,
                    layer_count: 1,
                },
                ..Default::default()
            },
        }
    }

    #[inline]
    pub fn as_info(&self) -> &vk::ImageViewCreateInfo<'static> {
        &self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_2d_info() {
        let info = GfxImageCreateInfo::new_image_2d_info(
            vk::Extent2D {
                width: 640,
                height: 480,
            },
            vk::Format::D16_UNORM,
            vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT,
        );
        let info = info.as_info();
        assert_eq!(info.extent.depth, 1);
        assert_eq!(info.extent.width, 640);
        assert_eq!(info.initial_layout, vk::ImageLayout::UNDEFINED);
    }
}
