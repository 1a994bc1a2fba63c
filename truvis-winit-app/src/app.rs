use truvis_crate_tools::init_log;
use truvis_renderer::{
    render_config::RendererConfig,
    renderer::{RenderWindow, Renderer},
};
use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop},
    window::WindowId,
};

use crate::{demo_pass::DemoPass, window::WinitWindow};

pub struct WinitApp {
    config: RendererConfig,

    window: Option<WinitWindow>,
    renderer: Option<Renderer>,
    demo_pass: Option<DemoPass>,
}
// 总的 main 函数
impl WinitApp {
    /// 整个程序的入口
    ///
    /// 没有给出配置文件时使用默认配置
    pub fn run(config_path: Option<&str>) -> anyhow::Result<()> {
        let config = match config_path {
            Some(path) => RendererConfig::from_file(path)?,
            None => RendererConfig::default(),
        };
        init_log::init_log(init_log::parse_level(&config.log_level));
        log::info!("renderer config: {:?}", config);

        let event_loop = EventLoop::new()?;
        let mut app = Self {
            config,
            window: None,
            renderer: None,
            demo_pass: None,
        };

        event_loop.run_app(&mut app)?;

        log::info!("end run.");

        app.destroy();
        Ok(())
    }
}
// new & init
impl WinitApp {
    /// 在 window 创建之后调用，初始化 Renderer 以及 pass 需要的资源
    fn init_after_window(&mut self, event_loop: &ActiveEventLoop) -> anyhow::Result<()> {
        let window = WinitWindow::new(event_loop, "Truvis", [1200.0, 800.0])?;
        let mut renderer = Renderer::new("Truvis", &window, self.config.clone())?;
        let demo_pass = DemoPass::register(renderer.resource_manager_mut());

        self.window = Some(window);
        self.renderer = Some(renderer);
        self.demo_pass = Some(demo_pass);
        Ok(())
    }
}
// update
impl WinitApp {
    fn draw_frame(&mut self) {
        let (Some(window), Some(renderer), Some(demo_pass)) =
            (self.window.as_ref(), self.renderer.as_mut(), self.demo_pass.as_ref())
        else {
            return;
        };
        if !window.should_continue() {
            return;
        }

        let Some(mut frame) = renderer.begin_frame(window) else {
            return;
        };
        let time_s = renderer.timer().total_time_s();
        demo_pass.record(renderer.device(), &mut frame, time_s);
        renderer.end_frame(frame);

        tracy_client::frame_mark();

        let timer = renderer.timer();
        if timer.total_frame() % 600 == 0 {
            log::debug!(
                "frame {}: {:.2} ms, gpu {:?} ms, fence wait {:?}, acquire {:?}",
                timer.total_frame(),
                timer.delta_time_ms(),
                timer.gpu_time_ms(),
                timer.fence_wait(),
                timer.acquire()
            );
        }
    }
}
// destroy
impl WinitApp {
    fn destroy(mut self) {
        self.demo_pass = None;
        // surface 依赖 window，必须先于 window 销毁
        if let Some(renderer) = self.renderer.take() {
            renderer.destroy();
        }
        self.window = None;
    }
}
// 各种 winit 的事件处理
impl ApplicationHandler for WinitApp {
    // 建议在这里创建 window 和 Renderer
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        log::info!("winit event: resumed");
        if self.window.is_some() {
            return;
        }

        if let Err(e) = self.init_after_window(event_loop) {
            log::error!("failed to init renderer: {:#}", e);
            event_loop.exit();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                if let Some(window) = self.window.as_mut() {
                    window.request_close();
                }
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                log::debug!("window resized: {}x{}", size.width, size.height);
                if let Some(renderer) = self.renderer.as_mut() {
                    renderer.request_rebuild();
                }
            }
            WindowEvent::RedrawRequested => {
                self.draw_frame();
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = self.window.as_ref() {
            window.request_redraw();
        }
    }

    fn suspended(&mut self, _event_loop: &ActiveEventLoop) {
        log::warn!("winit event: suspended");
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        log::info!("loop exiting");
    }
}
