use ash::vk;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle, RawDisplayHandle, RawWindowHandle};
use truvis_renderer::renderer::RenderWindow;
use winit::{event_loop::ActiveEventLoop, window::Window};

/// winit 窗口在渲染器一侧的包装
pub struct WinitWindow {
    window: Window,
    close_requested: bool,
}

// new & init
impl WinitWindow {
    pub fn new(event_loop: &ActiveEventLoop, title: &str, logical_extent: [f64; 2]) -> anyhow::Result<Self> {
        let window_attr = Window::default_attributes()
            .with_title(title)
            .with_inner_size(winit::dpi::LogicalSize::new(logical_extent[0], logical_extent[1]));
        let window = event_loop.create_window(window_attr)?;

        Ok(Self {
            window,
            close_requested: false,
        })
    }
}

// getters
impl WinitWindow {
    #[inline]
    pub fn window(&self) -> &Window {
        &self.window
    }
}

// update
impl WinitWindow {
    #[inline]
    pub fn request_close(&mut self) {
        self.close_requested = true;
    }

    #[inline]
    pub fn request_redraw(&self) {
        self.window.request_redraw();
    }
}

impl RenderWindow for WinitWindow {
    fn raw_display_handle(&self) -> RawDisplayHandle {
        match self.window.display_handle() {
            Ok(handle) => handle.as_raw(),
            Err(e) => panic!("failed to get display handle: {:?}", e),
        }
    }

    fn raw_window_handle(&self) -> RawWindowHandle {
        match self.window.window_handle() {
            Ok(handle) => handle.as_raw(),
            Err(e) => panic!("failed to get window handle: {:?}", e),
        }
    }

    fn physical_extent(&self) -> vk::Extent2D {
        let size = self.window.inner_size();
        vk::Extent2D {
            width: size.width,
            height: size.height,
        }
    }

    fn should_continue(&self) -> bool {
        !self.close_requested
    }
}
