//! Cooperative render loop on top of a host frame scheduler.
//!
//! The host owns the clock (`requestAnimationFrame` in the browser). Each
//! tick checks the running flag, pulls a snapshot from the state provider and
//! renders it. Any error stops the loop; there is no retry.

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::RenderError;
use crate::state::FrameState;

use super::backend::GlBackend;
use super::frame::{FrameInput, FrameRenderer, StopHandle};

/// What a tick asks the scheduler to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopControl {
    /// Schedule another tick.
    Continue,
    /// Do not reschedule.
    Stop,
}

/// Calls `tick` once per host frame until it returns [`LoopControl::Stop`].
pub trait FrameScheduler {
    fn start(&self, tick: Box<dyn FnMut() -> LoopControl>);
}

impl<B: GlBackend + 'static> FrameRenderer<B> {
    /// Starts rendering snapshots from `provider` on `scheduler`.
    ///
    /// The loop holds only a weak reference to the renderer, so dropping the
    /// last strong reference ends it. A snapshot without a field is skipped.
    /// Provider or render errors are logged and stop the loop.
    ///
    /// # Errors
    ///
    /// `RenderError::NotInitialized` if the renderer was disposed.
    pub fn start_render_loop<P, S>(
        this: &Rc<RefCell<Self>>,
        mut provider: P,
        scheduler: &S,
    ) -> Result<StopHandle, RenderError>
    where
        P: FnMut() -> Result<FrameState, RenderError> + 'static,
        S: FrameScheduler + ?Sized,
    {
        let running = {
            let renderer = this.borrow();
            if renderer.is_disposed() {
                return Err(RenderError::NotInitialized);
            }
            renderer.start()
        };
        let handle = running.clone();
        let weak = Rc::downgrade(this);

        scheduler.start(Box::new(move || {
            if !running.is_running() {
                log::debug!("render loop stopped");
                return LoopControl::Stop;
            }
            let Some(cell) = weak.upgrade() else {
                return LoopControl::Stop;
            };

            let state = match provider() {
                Ok(state) => state,
                Err(e) => {
                    log::error!("state provider failed, stopping render loop: {e}");
                    running.stop();
                    return LoopControl::Stop;
                }
            };
            let Some(input) = FrameInput::from_state(&state) else {
                return LoopControl::Continue;
            };

            let Ok(mut renderer) = cell.try_borrow_mut() else {
                log::warn!("renderer busy, skipping frame");
                return LoopControl::Continue;
            };
            match renderer.render_frame(&input) {
                Ok(()) => LoopControl::Continue,
                Err(e) => {
                    log::error!("render loop stopped: {e}");
                    renderer.stop();
                    LoopControl::Stop
                }
            }
        }));

        log::info!("render loop started");
        Ok(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::TextureEncoding;
    use crate::field::MultivectorField;
    use crate::render::fake::{pipeline, FakeBackend, GlCall};
    use crate::render::shader::ShaderRuntime;
    use std::cell::Cell;

    /// Runs ticks on demand.
    #[derive(Default)]
    struct ManualScheduler {
        tick: RefCell<Option<Box<dyn FnMut() -> LoopControl>>>,
    }

    impl ManualScheduler {
        /// Runs up to `frames` ticks; returns how many ran before a stop.
        fn run(&self, frames: usize) -> usize {
            let mut ran = 0;
            while ran < frames {
                let Some(tick) = self.tick.borrow_mut().as_mut().map(|t| t()) else {
                    break;
                };
                ran += 1;
                if tick == LoopControl::Stop {
                    self.tick.borrow_mut().take();
                    break;
                }
            }
            ran
        }
    }

    impl FrameScheduler for ManualScheduler {
        fn start(&self, tick: Box<dyn FnMut() -> LoopControl>) {
            *self.tick.borrow_mut() = Some(tick);
        }
    }

    fn renderer() -> (Rc<RefCell<FrameRenderer<FakeBackend>>>, FakeBackend) {
        let backend = FakeBackend::webgl2();
        let runtime = ShaderRuntime::with_backend(backend.clone());
        let renderer =
            FrameRenderer::new(runtime, pipeline(TextureEncoding::Float32), 64, 64).unwrap();
        (Rc::new(RefCell::new(renderer)), backend)
    }

    fn with_field() -> Result<FrameState, RenderError> {
        Ok(FrameState {
            clifford_field: Some(MultivectorField::zeros().with(0, 1.0)),
            ..FrameState::default()
        })
    }

    fn draws(backend: &FakeBackend) -> usize {
        backend.count(|c| matches!(c, GlCall::Draw(_)))
    }

    #[test]
    fn loop_renders_each_tick() {
        let (renderer, backend) = renderer();
        let scheduler = ManualScheduler::default();
        FrameRenderer::start_render_loop(&renderer, with_field, &scheduler).unwrap();
        assert!(renderer.borrow().is_running());

        assert_eq!(scheduler.run(5), 5);
        assert_eq!(draws(&backend), 5);
        assert_eq!(renderer.borrow().frame_count(), 5);
    }

    #[test]
    fn texture_handle_is_stable_across_loop_frames() {
        let (renderer, backend) = renderer();
        let scheduler = ManualScheduler::default();
        FrameRenderer::start_render_loop(&renderer, with_field, &scheduler).unwrap();
        scheduler.run(1);
        let handle = renderer.borrow().field_texture();
        scheduler.run(10);
        assert_eq!(renderer.borrow().field_texture(), handle);
        assert_eq!(backend.count(|c| matches!(c, GlCall::CreateTexture(..))), 1);
    }

    #[test]
    fn stop_between_frames_renders_nothing_more() {
        let (renderer, backend) = renderer();
        let scheduler = ManualScheduler::default();
        FrameRenderer::start_render_loop(&renderer, with_field, &scheduler).unwrap();
        scheduler.run(3);

        renderer.borrow().stop();
        assert_eq!(scheduler.run(10), 1, "only the exit tick runs");
        assert_eq!(draws(&backend), 3);
    }

    #[test]
    fn stop_during_a_frame_allows_at_most_one_more() {
        let (renderer, backend) = renderer();
        let scheduler = ManualScheduler::default();
        let handle = renderer.borrow().stop_handle();
        let calls = Rc::new(Cell::new(0));
        let provider_calls = Rc::clone(&calls);
        let provider = move || {
            provider_calls.set(provider_calls.get() + 1);
            if provider_calls.get() == 3 {
                handle.stop();
            }
            with_field()
        };
        FrameRenderer::start_render_loop(&renderer, provider, &scheduler).unwrap();

        scheduler.run(10);
        // Frame 3 was already in flight when stop() ran.
        assert_eq!(draws(&backend), 3);
        assert_eq!(calls.get(), 3);
        assert!(!renderer.borrow().is_running());
    }

    #[test]
    fn missing_field_skips_without_stopping() {
        let (renderer, backend) = renderer();
        let scheduler = ManualScheduler::default();
        FrameRenderer::start_render_loop(&renderer, || Ok(FrameState::default()), &scheduler)
            .unwrap();
        assert_eq!(scheduler.run(4), 4);
        assert_eq!(draws(&backend), 0);
        assert!(renderer.borrow().is_running());
    }

    #[test]
    fn provider_error_stops_the_loop() {
        let (renderer, _) = renderer();
        let scheduler = ManualScheduler::default();
        let provider = || Err(RenderError::Configuration("bad state".into()));
        FrameRenderer::start_render_loop(&renderer, provider, &scheduler).unwrap();
        assert_eq!(scheduler.run(5), 1);
        assert!(!renderer.borrow().is_running());
    }

    #[test]
    fn render_error_stops_the_loop() {
        let (renderer, backend) = renderer();
        backend.fail_texture(true);
        let scheduler = ManualScheduler::default();
        FrameRenderer::start_render_loop(&renderer, with_field, &scheduler).unwrap();
        assert_eq!(scheduler.run(5), 1);
        assert!(!renderer.borrow().is_running());
        assert_eq!(draws(&backend), 0);
    }

    #[test]
    fn dropping_the_renderer_ends_the_loop() {
        let (renderer, _) = renderer();
        let scheduler = ManualScheduler::default();
        FrameRenderer::start_render_loop(&renderer, with_field, &scheduler).unwrap();
        drop(renderer);
        assert_eq!(scheduler.run(5), 1);
    }

    #[test]
    fn disposed_renderer_cannot_start() {
        let (renderer, _) = renderer();
        renderer.borrow_mut().dispose();
        let scheduler = ManualScheduler::default();
        let result = FrameRenderer::start_render_loop(&renderer, with_field, &scheduler);
        assert!(matches!(result, Err(RenderError::NotInitialized)));
    }
}
