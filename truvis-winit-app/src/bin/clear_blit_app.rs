use truvis_winit_app::app::WinitApp;

fn main() -> anyhow::Result<()> {
    // 第一个参数为可选的配置文件路径
    let config_path = std::env::args().nth(1);
    WinitApp::run(config_path.as_deref())
}
