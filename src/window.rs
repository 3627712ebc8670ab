use crate::error::Result;
use crate::scheduler::SurfaceProvider;
use std::time::Duration;
use winit::dpi::LogicalSize;
use winit::event::{Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::platform::pump_events::{EventLoopExtPumpEvents, PumpStatus};
use winit::window::{Window, WindowBuilder};

/// The window plus its event loop, pumped by hand from the frame loop.
pub struct AppWindow {
    pub window: Window,
    event_loop: EventLoop<()>,
    resized: bool,
    close_requested: bool,
}

impl AppWindow {
    pub fn new(title: &str, width: u32, height: u32) -> Result<Self> {
        let event_loop = EventLoop::new()?;
        event_loop.set_control_flow(ControlFlow::Wait);
        let window = WindowBuilder::new()
            .with_title(title)
            .with_inner_size(LogicalSize::new(width, height))
            .build(&event_loop)?;

        Ok(AppWindow {
            window,
            event_loop,
            resized: false,
            close_requested: false,
        })
    }

    /// Handles whatever is queued without blocking.
    pub fn poll_events(&mut self) {
        self.pump(Some(Duration::ZERO));
    }

    /// True once if the window was resized since the last call.
    pub fn take_resize(&mut self) -> bool {
        std::mem::take(&mut self.resized)
    }

    fn pump(&mut self, timeout: Option<Duration>) {
        let window_id = self.window.id();
        let resized = &mut self.resized;
        let close_requested = &mut self.close_requested;
        let status = self.event_loop.pump_events(timeout, |event, _| {
            let Event::WindowEvent { window_id: id, event } = event else {
                return;
            };
            if id != window_id {
                return;
            }
            match event {
                WindowEvent::CloseRequested => *close_requested = true,
                WindowEvent::Resized(size) => {
                    log::debug!("Window resized to {}x{}", size.width, size.height);
                    *resized = true;
                }
                _ => {}
            }
        });
        if let PumpStatus::Exit(code) = status {
            log::debug!("Event loop exited with code {}", code);
            self.close_requested = true;
        }
    }
}

impl SurfaceProvider for AppWindow {
    fn framebuffer_size(&self) -> (u32, u32) {
        let size = self.window.inner_size();
        (size.width, size.height)
    }

    fn wait_events(&mut self) {
        self.pump(None);
    }

    fn close_requested(&self) -> bool {
        self.close_requested
    }
}
