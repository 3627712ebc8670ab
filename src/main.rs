mod config;
mod error;
mod frame;
mod geometry;
mod lv;
mod recorder;
mod renderer;
mod resources;
mod scheduler;
mod uniforms;
mod utility;
mod window;

use config::{RenderConfig, Session, WINDOW_HEIGHT, WINDOW_TITLE, WINDOW_WIDTH};
use error::Result;
use renderer::VulkanRenderer;
use scheduler::{FrameOutcome, FrameScheduler, SurfaceProvider};
use uniforms::{Animation, StartClock};
use window::AppWindow;

struct VulkanApp {
    // Dropped before the window its surface was created from
    renderer: VulkanRenderer,
    window: AppWindow,
    scheduler: FrameScheduler<StartClock>,
    session: Session,
}

impl VulkanApp {
    pub fn new(config: RenderConfig) -> Result<VulkanApp> {
        let window = AppWindow::new(WINDOW_TITLE, WINDOW_WIDTH, WINDOW_HEIGHT)?;
        let renderer = VulkanRenderer::new(&window.window, &config)?;
        let scheduler = FrameScheduler::new(
            config.frames_in_flight,
            Animation::new(config.rotation_degrees_per_second),
            StartClock::start(),
        );

        Ok(VulkanApp {
            renderer,
            window,
            scheduler,
            session: Session::new(config),
        })
    }

    pub fn main_loop(&mut self) -> Result<()> {
        loop {
            self.window.poll_events();
            if self.window.close_requested() {
                break;
            }
            if self.window.take_resize() {
                self.session.request_resize();
            }

            let outcome =
                self.scheduler
                    .draw_frame(&mut self.renderer, &mut self.window, &mut self.session)?;
            if outcome == FrameOutcome::Closed {
                break;
            }
        }

        log::info!("Exiting application");
        self.scheduler.shutdown(&mut self.renderer)
    }
}

fn run() -> Result<()> {
    let mut app = VulkanApp::new(RenderConfig::default())?;
    app.main_loop()
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(err) = run() {
        // One line on stderr regardless of RUST_LOG
        eprintln!("error: {}", err);
        std::process::exit(1);
    }
}
