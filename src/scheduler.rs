use crate::config::Session;
use crate::error::Result;
use crate::uniforms::{Animation, FrameClock, UniformBufferObject};
use ash::vk;

/// Where the scheduler is within one iteration of `draw_frame`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameState {
    Idle,
    Waiting,
    Acquiring,
    Recording,
    Submitting,
    Presenting,
    Recreating,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AcquireOutcome {
    Ready { image_index: u32, suboptimal: bool },
    OutOfDate,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PresentOutcome {
    Presented,
    Suboptimal,
    OutOfDate,
}

/// What one call to `draw_frame` did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameOutcome {
    Presented,
    /// Presented, then rebuilt the swap chain because it went stale
    PresentedThenRecreated,
    /// Acquire reported out-of-date; nothing was submitted and the swap chain was rebuilt
    Skipped,
    /// The window closed while waiting for a drawable size
    Closed,
}

/// GPU-side operations the frame loop drives.
pub trait FrameBackend {
    fn frames_in_flight(&self) -> usize;
    fn swapchain_extent(&self) -> vk::Extent2D;
    /// Blocks until the slot's previous submission has finished on the GPU.
    fn wait_for_slot(&mut self, slot: usize) -> Result<()>;
    /// Signals the slot's acquire semaphore once the image is ready.
    fn acquire_next_image(&mut self, slot: usize) -> Result<AcquireOutcome>;
    /// Unsignals the slot's fence and resets its command buffer.
    fn reset_slot(&mut self, slot: usize) -> Result<()>;
    fn record_commands(&mut self, slot: usize, image_index: u32) -> Result<()>;
    fn write_uniforms(&mut self, slot: usize, ubo: &UniformBufferObject) -> Result<()>;
    fn submit(&mut self, slot: usize) -> Result<()>;
    fn present(&mut self, slot: usize, image_index: u32) -> Result<PresentOutcome>;
    fn wait_idle(&mut self) -> Result<()>;
    /// Tears down the swap chain and everything per-image, then builds it again.
    fn rebuild_swapchain(&mut self, framebuffer_size: vk::Extent2D) -> Result<()>;
}

/// The window as seen by the frame loop.
pub trait SurfaceProvider {
    /// Drawable size in pixels; zero while minimized.
    fn framebuffer_size(&self) -> (u32, u32);
    /// Blocks until at least one window event has been handled.
    fn wait_events(&mut self);
    fn close_requested(&self) -> bool;
}

pub struct FrameScheduler<C: FrameClock> {
    frames_in_flight: usize,
    current_slot: usize,
    state: FrameState,
    acquired_image: Option<u32>,
    animation: Animation,
    clock: C,
}

impl<C: FrameClock> FrameScheduler<C> {
    pub fn new(frames_in_flight: usize, animation: Animation, clock: C) -> Self {
        assert!(frames_in_flight > 0, "at least one frame must be in flight");
        FrameScheduler {
            frames_in_flight,
            current_slot: 0,
            state: FrameState::Idle,
            acquired_image: None,
            animation,
            clock,
        }
    }

    pub fn current_slot(&self) -> usize {
        self.current_slot
    }

    pub fn state(&self) -> FrameState {
        self.state
    }

    /// One full iteration: wait, acquire, reset, record, update, submit, present and,
    /// if anything reported the swap chain stale, recreate.
    pub fn draw_frame(
        &mut self,
        backend: &mut impl FrameBackend,
        surface: &mut impl SurfaceProvider,
        session: &mut Session,
    ) -> Result<FrameOutcome> {
        assert_eq!(
            backend.frames_in_flight(),
            self.frames_in_flight,
            "backend and scheduler disagree on frames in flight"
        );
        let slot = self.current_slot;

        self.state = FrameState::Waiting;
        backend.wait_for_slot(slot)?;

        self.state = FrameState::Acquiring;
        let (image_index, acquire_suboptimal) = match backend.acquire_next_image(slot)? {
            AcquireOutcome::Ready {
                image_index,
                suboptimal,
            } => (image_index, suboptimal),
            AcquireOutcome::OutOfDate => {
                log::debug!("Swap chain out of date on acquire");
                // This rebuild also covers any pending resize
                session.take_resize_request();
                return Ok(if self.recreate(backend, surface)? {
                    FrameOutcome::Skipped
                } else {
                    FrameOutcome::Closed
                });
            }
        };
        self.acquired_image = Some(image_index);

        self.state = FrameState::Recording;
        backend.reset_slot(slot)?;
        backend.record_commands(slot, image_index)?;
        let ubo = self
            .animation
            .ubo(self.clock.elapsed(), backend.swapchain_extent());
        backend.write_uniforms(slot, &ubo)?;

        self.state = FrameState::Submitting;
        backend.submit(slot)?;

        self.state = FrameState::Presenting;
        let presented = self.acquired_image.take();
        assert_eq!(
            presented,
            Some(image_index),
            "presenting an image that was not acquired"
        );
        let present_outcome = backend.present(slot, image_index)?;
        let resize_requested = session.take_resize_request();
        self.current_slot = (slot + 1) % self.frames_in_flight;

        if acquire_suboptimal || resize_requested || present_outcome != PresentOutcome::Presented {
            log::debug!(
                "Recreating swap chain (present: {:?}, suboptimal acquire: {}, resize: {})",
                present_outcome,
                acquire_suboptimal,
                resize_requested
            );
            return Ok(if self.recreate(backend, surface)? {
                FrameOutcome::PresentedThenRecreated
            } else {
                FrameOutcome::Closed
            });
        }

        self.state = FrameState::Idle;
        Ok(FrameOutcome::Presented)
    }

    /// Rebuilds the swap chain once the window has a drawable size. Returns false,
    /// without rebuilding, if the window is closed while minimized.
    pub fn recreate(
        &mut self,
        backend: &mut impl FrameBackend,
        surface: &mut impl SurfaceProvider,
    ) -> Result<bool> {
        self.state = FrameState::Recreating;

        let (mut width, mut height) = surface.framebuffer_size();
        while width == 0 || height == 0 {
            if surface.close_requested() {
                self.state = FrameState::Idle;
                return Ok(false);
            }
            surface.wait_events();
            (width, height) = surface.framebuffer_size();
        }

        backend.wait_idle()?;
        backend.rebuild_swapchain(vk::Extent2D { width, height })?;
        log::debug!("Swap chain recreated for {}x{}", width, height);

        self.state = FrameState::Idle;
        Ok(true)
    }

    /// Final idle wait; after this every GPU object may be dropped.
    pub fn shutdown(&mut self, backend: &mut impl FrameBackend) -> Result<()> {
        self.state = FrameState::Idle;
        backend.wait_idle()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RenderConfig;
    use crate::error::Error;
    use crate::lv::{SwapchainPreferred, SwapchainSupportDetails};
    use approx::assert_relative_eq;
    use std::cell::Cell;
    use std::collections::VecDeque;
    use std::rc::Rc;
    use std::time::Duration;

    #[derive(Clone, Debug, PartialEq)]
    enum Call {
        Wait { slot: usize, blocked: bool },
        Acquire { slot: usize },
        Reset { slot: usize },
        Record { slot: usize, image_index: u32 },
        Uniforms { slot: usize },
        Submit { slot: usize },
        Present { slot: usize, image_index: u32 },
        WaitIdle,
        Rebuild { width: u32, height: u32 },
    }

    #[derive(Clone, Copy, Debug)]
    struct BuiltSwapchain {
        image_count: u32,
        format: vk::Format,
        extent: vk::Extent2D,
    }

    /// Simulated GPU. Submitted work finishes either immediately or, with a lazy GPU,
    /// only when a wait needs it, oldest submission first.
    struct MockBackend {
        frames_in_flight: usize,
        lazy_gpu: bool,
        calls: Vec<Call>,
        fence_signaled: Vec<bool>,
        pending: VecDeque<usize>,
        completed: Vec<usize>,
        support: SwapchainSupportDetails,
        preferred: SwapchainPreferred,
        swapchain: BuiltSwapchain,
        rebuilt: Vec<BuiltSwapchain>,
        next_image: u32,
        acquired: Option<u32>,
        acquire_script: VecDeque<Result<AcquireOutcome>>,
        present_script: VecDeque<PresentOutcome>,
        ubos: Vec<UniformBufferObject>,
    }

    impl MockBackend {
        fn new(frames_in_flight: usize, min_image_count: u32) -> Self {
            let support = SwapchainSupportDetails {
                capabilities: vk::SurfaceCapabilitiesKHR {
                    min_image_count,
                    max_image_count: 8,
                    current_extent: vk::Extent2D {
                        width: u32::MAX,
                        height: u32::MAX,
                    },
                    min_image_extent: vk::Extent2D {
                        width: 1,
                        height: 1,
                    },
                    max_image_extent: vk::Extent2D {
                        width: 4096,
                        height: 4096,
                    },
                    ..Default::default()
                },
                formats: vec![vk::SurfaceFormatKHR {
                    format: vk::Format::B8G8R8A8_SRGB,
                    color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
                }],
                present_modes: vec![vk::PresentModeKHR::FIFO],
            };
            let config = RenderConfig::default();
            let preferred = SwapchainPreferred {
                surface_format: config.preferred_surface_format,
                present_mode: config.preferred_present_mode,
            };
            let mut backend = MockBackend {
                frames_in_flight,
                lazy_gpu: false,
                calls: Vec::new(),
                fence_signaled: vec![true; frames_in_flight],
                pending: VecDeque::new(),
                completed: Vec::new(),
                swapchain: BuiltSwapchain {
                    image_count: 0,
                    format: vk::Format::UNDEFINED,
                    extent: vk::Extent2D::default(),
                },
                support,
                preferred,
                rebuilt: Vec::new(),
                next_image: 0,
                acquired: None,
                acquire_script: VecDeque::new(),
                present_script: VecDeque::new(),
                ubos: Vec::new(),
            };
            backend.swapchain = backend.build(vk::Extent2D {
                width: 800,
                height: 600,
            });
            backend
        }

        fn lazy(mut self) -> Self {
            self.lazy_gpu = true;
            self
        }

        fn build(&self, framebuffer_size: vk::Extent2D) -> BuiltSwapchain {
            BuiltSwapchain {
                image_count: self.support.choose_image_count(),
                format: self
                    .support
                    .choose_format(self.preferred.surface_format)
                    .unwrap()
                    .format,
                extent: self.support.choose_extent(framebuffer_size),
            }
        }

        fn complete_oldest(&mut self) {
            let slot = self
                .pending
                .pop_front()
                .expect("waiting on a fence that no submission will signal");
            self.fence_signaled[slot] = true;
            self.completed.push(slot);
        }

        fn count(&self, matches: impl Fn(&Call) -> bool) -> usize {
            self.calls.iter().filter(|call| matches(call)).count()
        }

        fn rebuild_count(&self) -> usize {
            self.count(|call| matches!(call, Call::Rebuild { .. }))
        }
    }

    impl FrameBackend for MockBackend {
        fn frames_in_flight(&self) -> usize {
            self.frames_in_flight
        }

        fn swapchain_extent(&self) -> vk::Extent2D {
            self.swapchain.extent
        }

        fn wait_for_slot(&mut self, slot: usize) -> Result<()> {
            let blocked = !self.fence_signaled[slot];
            while !self.fence_signaled[slot] {
                self.complete_oldest();
            }
            self.calls.push(Call::Wait { slot, blocked });
            Ok(())
        }

        fn acquire_next_image(&mut self, slot: usize) -> Result<AcquireOutcome> {
            self.calls.push(Call::Acquire { slot });
            let outcome = self.acquire_script.pop_front().unwrap_or_else(|| {
                Ok(AcquireOutcome::Ready {
                    image_index: self.next_image,
                    suboptimal: false,
                })
            })?;
            if let AcquireOutcome::Ready { image_index, .. } = outcome {
                assert!(image_index < self.swapchain.image_count);
                self.next_image = (image_index + 1) % self.swapchain.image_count;
                self.acquired = Some(image_index);
            }
            Ok(outcome)
        }

        fn reset_slot(&mut self, slot: usize) -> Result<()> {
            assert!(
                self.fence_signaled[slot],
                "slot {} reset while still in flight",
                slot
            );
            self.fence_signaled[slot] = false;
            self.calls.push(Call::Reset { slot });
            Ok(())
        }

        fn record_commands(&mut self, slot: usize, image_index: u32) -> Result<()> {
            assert!(!self.pending.contains(&slot), "recording into a busy slot");
            self.calls.push(Call::Record { slot, image_index });
            Ok(())
        }

        fn write_uniforms(&mut self, slot: usize, ubo: &UniformBufferObject) -> Result<()> {
            assert!(!self.pending.contains(&slot), "uniforms written while read");
            self.ubos.push(*ubo);
            self.calls.push(Call::Uniforms { slot });
            Ok(())
        }

        fn submit(&mut self, slot: usize) -> Result<()> {
            assert!(
                !self.pending.contains(&slot),
                "two submissions outstanding for slot {}",
                slot
            );
            assert!(!self.fence_signaled[slot], "submitting without a fence reset");
            self.calls.push(Call::Submit { slot });
            if self.lazy_gpu {
                self.pending.push_back(slot);
            } else {
                self.fence_signaled[slot] = true;
                self.completed.push(slot);
            }
            Ok(())
        }

        fn present(&mut self, slot: usize, image_index: u32) -> Result<PresentOutcome> {
            assert_eq!(self.acquired.take(), Some(image_index));
            self.calls.push(Call::Present { slot, image_index });
            Ok(self
                .present_script
                .pop_front()
                .unwrap_or(PresentOutcome::Presented))
        }

        fn wait_idle(&mut self) -> Result<()> {
            while !self.pending.is_empty() {
                self.complete_oldest();
            }
            self.calls.push(Call::WaitIdle);
            Ok(())
        }

        fn rebuild_swapchain(&mut self, framebuffer_size: vk::Extent2D) -> Result<()> {
            assert!(self.pending.is_empty(), "rebuild while GPU busy");
            assert!(framebuffer_size.width > 0 && framebuffer_size.height > 0);
            self.calls.push(Call::Rebuild {
                width: framebuffer_size.width,
                height: framebuffer_size.height,
            });
            self.swapchain = self.build(framebuffer_size);
            self.rebuilt.push(self.swapchain);
            self.next_image = 0;
            Ok(())
        }
    }

    struct MockSurface {
        sizes: VecDeque<(u32, u32)>,
        last_size: (u32, u32),
        wait_events: usize,
        close_after_waits: Option<usize>,
    }

    impl MockSurface {
        fn new(sizes: &[(u32, u32)]) -> Self {
            MockSurface {
                sizes: sizes.iter().copied().collect(),
                last_size: (800, 600),
                wait_events: 0,
                close_after_waits: None,
            }
        }
    }

    impl SurfaceProvider for MockSurface {
        fn framebuffer_size(&self) -> (u32, u32) {
            self.sizes.front().copied().unwrap_or(self.last_size)
        }

        fn wait_events(&mut self) {
            self.wait_events += 1;
            if let Some(size) = self.sizes.pop_front() {
                self.last_size = size;
            }
            if self.sizes.is_empty() {
                self.sizes.push_back(self.last_size);
            }
        }

        fn close_requested(&self) -> bool {
            self.close_after_waits
                .is_some_and(|waits| self.wait_events >= waits)
        }
    }

    #[derive(Clone, Default)]
    struct ManualClock(Rc<Cell<Duration>>);

    impl ManualClock {
        fn advance(&self, by: Duration) {
            self.0.set(self.0.get() + by);
        }
    }

    impl FrameClock for ManualClock {
        fn elapsed(&self) -> Duration {
            self.0.get()
        }
    }

    fn scheduler(frames_in_flight: usize) -> (FrameScheduler<ManualClock>, ManualClock) {
        let clock = ManualClock::default();
        (
            FrameScheduler::new(frames_in_flight, Animation::new(90.0), clock.clone()),
            clock,
        )
    }

    fn session() -> Session {
        Session::new(RenderConfig::default())
    }

    fn submitted_slots(backend: &MockBackend) -> Vec<usize> {
        backend
            .calls
            .iter()
            .filter_map(|call| match call {
                Call::Submit { slot } => Some(*slot),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn fence_guards_every_resubmission() {
        let (mut scheduler, _) = scheduler(2);
        let mut backend = MockBackend::new(2, 2).lazy();
        let mut surface = MockSurface::new(&[]);
        let mut session = session();
        for _ in 0..7 {
            scheduler
                .draw_frame(&mut backend, &mut surface, &mut session)
                .unwrap();
        }

        // Between two submissions of a slot there is a wait on it, then a reset
        for slot in 0..2 {
            let positions: Vec<usize> = backend
                .calls
                .iter()
                .enumerate()
                .filter(|(_, call)| **call == Call::Submit { slot })
                .map(|(position, _)| position)
                .collect();
            for pair in positions.windows(2) {
                let between = &backend.calls[pair[0]..pair[1]];
                let wait = between
                    .iter()
                    .position(|call| matches!(call, Call::Wait { slot: s, .. } if *s == slot))
                    .expect("resubmitted without waiting");
                let reset = between
                    .iter()
                    .position(|call| *call == Call::Reset { slot })
                    .expect("resubmitted without resetting");
                assert!(wait < reset);
            }
        }
        assert!(backend.pending.len() <= 2);
    }

    #[test]
    fn cpu_stays_within_frames_in_flight() {
        let (mut scheduler, _) = scheduler(2);
        let mut backend = MockBackend::new(2, 2).lazy();
        let mut surface = MockSurface::new(&[]);
        let mut session = session();

        for _ in 0..2 {
            scheduler
                .draw_frame(&mut backend, &mut surface, &mut session)
                .unwrap();
        }
        assert_eq!(submitted_slots(&backend), vec![0, 1]);
        assert!(backend.completed.is_empty());
        assert_eq!(backend.pending, VecDeque::from(vec![0, 1]));

        let before = backend.calls.len();
        scheduler
            .draw_frame(&mut backend, &mut surface, &mut session)
            .unwrap();
        let third = &backend.calls[before..];

        // Frame 2 had to wait for frame 0 and nothing more
        assert_eq!(third[0], Call::Wait { slot: 0, blocked: true });
        assert_eq!(backend.completed, vec![0]);
        assert!(third.contains(&Call::Record {
            slot: 0,
            image_index: 2
        }));
        assert_eq!(backend.pending, VecDeque::from(vec![1, 0]));
    }

    #[test]
    fn repeated_recreation_is_stable() {
        let (mut scheduler, _) = scheduler(2);
        let mut backend = MockBackend::new(2, 2);
        let mut surface = MockSurface::new(&[]);
        let original = backend.swapchain;

        for _ in 0..3 {
            assert!(scheduler.recreate(&mut backend, &mut surface).unwrap());
        }
        assert_eq!(backend.rebuilt.len(), 3);
        for built in &backend.rebuilt {
            assert_eq!(built.image_count, original.image_count);
            assert_eq!(built.format, original.format);
            assert_eq!(
                (built.extent.width, built.extent.height),
                (original.extent.width, original.extent.height)
            );
        }
        assert_eq!(backend.count(|call| *call == Call::WaitIdle), 3);
        assert!(submitted_slots(&backend).is_empty());
        assert_eq!(scheduler.state(), FrameState::Idle);
    }

    #[test]
    fn minimized_window_stalls_recreation() {
        let (mut scheduler, _) = scheduler(2);
        let mut backend = MockBackend::new(2, 2);
        let mut surface = MockSurface::new(&[(0, 0), (0, 0), (800, 600)]);

        assert!(scheduler.recreate(&mut backend, &mut surface).unwrap());
        assert_eq!(surface.wait_events, 2);
        assert_eq!(
            backend.calls,
            vec![
                Call::WaitIdle,
                Call::Rebuild {
                    width: 800,
                    height: 600
                }
            ]
        );
    }

    #[test]
    fn closing_while_minimized_skips_rebuild() {
        let (mut scheduler, _) = scheduler(2);
        let mut backend = MockBackend::new(2, 2);
        let mut surface = MockSurface::new(&[(0, 0)]);
        surface.last_size = (0, 0);
        surface.close_after_waits = Some(3);

        assert!(!scheduler.recreate(&mut backend, &mut surface).unwrap());
        assert_eq!(surface.wait_events, 3);
        assert_eq!(backend.rebuild_count(), 0);
        assert_eq!(scheduler.state(), FrameState::Idle);
    }

    #[test]
    fn stale_present_recreates_once() {
        let (mut scheduler, _) = scheduler(2);
        let mut backend = MockBackend::new(2, 2);
        backend.present_script.push_back(PresentOutcome::OutOfDate);
        let mut surface = MockSurface::new(&[]);
        let mut session = session();
        session.request_resize();

        let outcome = scheduler
            .draw_frame(&mut backend, &mut surface, &mut session)
            .unwrap();
        assert_eq!(outcome, FrameOutcome::PresentedThenRecreated);
        assert!(!session.resize_requested());

        for _ in 0..4 {
            assert_eq!(
                scheduler
                    .draw_frame(&mut backend, &mut surface, &mut session)
                    .unwrap(),
                FrameOutcome::Presented
            );
        }
        assert_eq!(backend.rebuild_count(), 1);
    }

    #[test]
    fn suboptimal_present_recreates() {
        let (mut scheduler, _) = scheduler(2);
        let mut backend = MockBackend::new(2, 2);
        backend.present_script.push_back(PresentOutcome::Suboptimal);
        let mut surface = MockSurface::new(&[]);
        let mut session = session();

        let outcome = scheduler
            .draw_frame(&mut backend, &mut surface, &mut session)
            .unwrap();
        assert_eq!(outcome, FrameOutcome::PresentedThenRecreated);
        assert_eq!(backend.rebuild_count(), 1);
    }

    #[test]
    fn resize_flag_alone_recreates() {
        let (mut scheduler, _) = scheduler(2);
        let mut backend = MockBackend::new(2, 2);
        let mut surface = MockSurface::new(&[(1024, 768)]);
        let mut session = session();

        scheduler
            .draw_frame(&mut backend, &mut surface, &mut session)
            .unwrap();
        assert_eq!(backend.rebuild_count(), 0);

        session.request_resize();
        let outcome = scheduler
            .draw_frame(&mut backend, &mut surface, &mut session)
            .unwrap();
        assert_eq!(outcome, FrameOutcome::PresentedThenRecreated);
        assert!(!session.resize_requested());
        assert!(backend.calls.contains(&Call::Rebuild {
            width: 1024,
            height: 768
        }));
        assert_eq!(backend.swapchain_extent().width, 1024);
    }

    #[test]
    fn suboptimal_acquire_presents_then_recreates() {
        let (mut scheduler, _) = scheduler(2);
        let mut backend = MockBackend::new(2, 2);
        backend.acquire_script.push_back(Ok(AcquireOutcome::Ready {
            image_index: 0,
            suboptimal: true,
        }));
        let mut surface = MockSurface::new(&[]);
        let mut session = session();

        let outcome = scheduler
            .draw_frame(&mut backend, &mut surface, &mut session)
            .unwrap();
        assert_eq!(outcome, FrameOutcome::PresentedThenRecreated);
        let present = backend
            .calls
            .iter()
            .position(|call| matches!(call, Call::Present { .. }))
            .unwrap();
        let rebuild = backend
            .calls
            .iter()
            .position(|call| matches!(call, Call::Rebuild { .. }))
            .unwrap();
        assert!(present < rebuild);
    }

    #[test]
    fn out_of_date_acquire_skips_the_frame() {
        let (mut scheduler, _) = scheduler(2);
        let mut backend = MockBackend::new(2, 2).lazy();
        backend.acquire_script.push_back(Ok(AcquireOutcome::OutOfDate));
        let mut surface = MockSurface::new(&[]);
        let mut session = session();
        session.request_resize();

        let outcome = scheduler
            .draw_frame(&mut backend, &mut surface, &mut session)
            .unwrap();
        assert_eq!(outcome, FrameOutcome::Skipped);
        assert_eq!(scheduler.current_slot(), 0);
        assert!(!session.resize_requested());
        assert_eq!(backend.rebuild_count(), 1);
        assert_eq!(backend.count(|call| matches!(call, Call::Reset { .. })), 0);
        assert!(submitted_slots(&backend).is_empty());

        // The slot's fence was never reset, so the retry does not block
        let before = backend.calls.len();
        let outcome = scheduler
            .draw_frame(&mut backend, &mut surface, &mut session)
            .unwrap();
        assert_eq!(outcome, FrameOutcome::Presented);
        assert_eq!(backend.calls[before], Call::Wait { slot: 0, blocked: false });
        assert_eq!(submitted_slots(&backend), vec![0]);
    }

    #[test]
    fn driver_errors_are_fatal() {
        let (mut scheduler, _) = scheduler(2);
        let mut backend = MockBackend::new(2, 2);
        backend.acquire_script.push_back(Err(Error::DeviceLost));
        let mut surface = MockSurface::new(&[]);
        let mut session = session();

        let result = scheduler.draw_frame(&mut backend, &mut surface, &mut session);
        assert!(matches!(result, Err(Error::DeviceLost)));
        assert_eq!(backend.rebuild_count(), 0);
        assert!(submitted_slots(&backend).is_empty());
    }

    #[test]
    fn ten_frames_cycle_two_slots_over_three_images() {
        let (mut scheduler, _) = scheduler(2);
        let mut backend = MockBackend::new(2, 2);
        assert_eq!(backend.swapchain.image_count, 3);
        let mut surface = MockSurface::new(&[]);
        let mut session = session();

        for _ in 0..10 {
            assert_eq!(
                scheduler
                    .draw_frame(&mut backend, &mut surface, &mut session)
                    .unwrap(),
                FrameOutcome::Presented
            );
            assert_eq!(scheduler.state(), FrameState::Idle);
        }

        assert_eq!(backend.count(|call| matches!(call, Call::Record { .. })), 10);
        assert_eq!(backend.count(|call| matches!(call, Call::Present { .. })), 10);
        assert_eq!(
            submitted_slots(&backend),
            vec![0, 1, 0, 1, 0, 1, 0, 1, 0, 1]
        );
        let images: Vec<u32> = backend
            .calls
            .iter()
            .filter_map(|call| match call {
                Call::Present { image_index, .. } => Some(*image_index),
                _ => None,
            })
            .collect();
        assert_eq!(images, vec![0, 1, 2, 0, 1, 2, 0, 1, 2, 0]);
        assert_eq!(
            backend.count(|call| matches!(call, Call::Wait { blocked: true, .. })),
            0
        );
        assert_eq!(backend.rebuild_count(), 0);
    }

    #[test]
    fn uniforms_follow_the_clock_not_the_frame_count() {
        let (mut scheduler, clock) = scheduler(2);
        let mut backend = MockBackend::new(2, 2);
        let mut surface = MockSurface::new(&[]);
        let mut session = session();

        clock.advance(Duration::from_millis(400));
        scheduler
            .draw_frame(&mut backend, &mut surface, &mut session)
            .unwrap();
        // Many frames in between, each with its own small step
        for _ in 0..5 {
            clock.advance(Duration::from_millis(300));
            scheduler
                .draw_frame(&mut backend, &mut surface, &mut session)
                .unwrap();
        }

        let angle = |ubo: &UniformBufferObject| {
            ubo.model
                .x_axis
                .y
                .atan2(ubo.model.x_axis.x)
                .to_degrees()
                .rem_euclid(360.0)
        };
        let first = angle(&backend.ubos[0]);
        let last = angle(&backend.ubos[5]);
        assert_relative_eq!(
            (last - first).rem_euclid(360.0),
            (1.5f32 * 90.0).rem_euclid(360.0),
            epsilon = 1e-2
        );
    }

    #[test]
    fn shutdown_drains_the_gpu() {
        let (mut scheduler, _) = scheduler(2);
        let mut backend = MockBackend::new(2, 2).lazy();
        let mut surface = MockSurface::new(&[]);
        let mut session = session();
        for _ in 0..2 {
            scheduler
                .draw_frame(&mut backend, &mut surface, &mut session)
                .unwrap();
        }
        scheduler.shutdown(&mut backend).unwrap();
        assert!(backend.pending.is_empty());
        assert_eq!(backend.calls.last(), Some(&Call::WaitIdle));
    }
}
