//! `requestAnimationFrame` implementation of [`FrameScheduler`].
//!
//! The rAF closure is created once per loop and re-registered each frame.
//! It reaches itself through a weak reference, so the scheduler owns the only
//! strong one and dropping the scheduler frees it after cancelling any
//! pending frame.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use cliffray_core::render::{FrameScheduler, LoopControl};
use wasm_bindgen::prelude::*;

type RafClosure = Rc<RefCell<Option<Closure<dyn FnMut(f64)>>>>;

#[derive(Default)]
pub struct RafScheduler {
    closure: RafClosure,
    pending: Rc<Cell<Option<i32>>>,
}

impl RafScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    fn cancel_pending(&self) {
        if let (Some(id), Some(window)) = (self.pending.take(), web_sys::window()) {
            if let Err(e) = window.cancel_animation_frame(id) {
                log::warn!("cancelAnimationFrame failed: {e:?}");
            }
        }
    }
}

/// Registers the closure for the next frame; returns the request id.
fn request_frame(closure: &RefCell<Option<Closure<dyn FnMut(f64)>>>) -> Option<i32> {
    let window = web_sys::window()?;
    let slot = closure.borrow();
    let callback = slot.as_ref()?;
    match window.request_animation_frame(callback.as_ref().unchecked_ref()) {
        Ok(id) => Some(id),
        Err(e) => {
            log::error!("requestAnimationFrame failed: {e:?}");
            None
        }
    }
}

impl FrameScheduler for RafScheduler {
    fn start(&self, mut tick: Box<dyn FnMut() -> LoopControl>) {
        self.cancel_pending();

        let this: Weak<RefCell<Option<Closure<dyn FnMut(f64)>>>> = Rc::downgrade(&self.closure);
        let pending = Rc::clone(&self.pending);
        let callback = Closure::wrap(Box::new(move |_timestamp: f64| {
            pending.set(None);
            if tick() == LoopControl::Stop {
                return;
            }
            if let Some(closure) = this.upgrade() {
                pending.set(request_frame(&closure));
            }
        }) as Box<dyn FnMut(f64)>);

        // Not called from inside the old callback, so replacing it is safe.
        *self.closure.borrow_mut() = Some(callback);
        self.pending.set(request_frame(&self.closure));
    }
}

impl Drop for RafScheduler {
    fn drop(&mut self) {
        self.cancel_pending();
    }
}
