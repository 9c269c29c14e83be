//! Browser plumbing: event subscriptions, timers, the animation loop and
//! image decoding.
//!
//! Every handle here releases what it registered when dropped, so whoever
//! owns the handle controls the subscription's lifetime.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::{CanvasRenderingContext2d, EventTarget, HtmlCanvasElement, HtmlImageElement};

use super::{FrameHandler, LoopControl};
use crate::sim::LandMask;

fn window() -> Result<web_sys::Window, JsValue> {
    web_sys::window().ok_or_else(|| JsValue::from_str("no window"))
}

/// An event listener that unregisters itself on drop
pub struct Listener {
    target: EventTarget,
    event: &'static str,
    callback: Closure<dyn FnMut(web_sys::Event)>,
}

impl Listener {
    pub fn new<F>(target: &EventTarget, event: &'static str, handler: F) -> Result<Self, JsValue>
    where
        F: FnMut(web_sys::Event) + 'static,
    {
        let callback = Closure::<dyn FnMut(web_sys::Event)>::new(handler);
        target.add_event_listener_with_callback(event, callback.as_ref().unchecked_ref())?;
        Ok(Self {
            target: target.clone(),
            event,
            callback,
        })
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        let _ = self
            .target
            .remove_event_listener_with_callback(self.event, self.callback.as_ref().unchecked_ref());
    }
}

/// A `setInterval` timer, cleared on drop
pub struct Interval {
    handle: i32,
    _callback: Closure<dyn FnMut()>,
}

impl Interval {
    pub fn new<F>(period_ms: u32, handler: F) -> Result<Self, JsValue>
    where
        F: FnMut() + 'static,
    {
        let callback = Closure::<dyn FnMut()>::new(handler);
        let handle = window()?.set_interval_with_callback_and_timeout_and_arguments_0(
            callback.as_ref().unchecked_ref(),
            period_ms.min(i32::MAX as u32) as i32,
        )?;
        Ok(Self {
            handle,
            _callback: callback,
        })
    }
}

impl Drop for Interval {
    fn drop(&mut self) {
        if let Some(window) = web_sys::window() {
            window.clear_interval_with_handle(self.handle);
        }
    }
}

/// Run `f` once after `delay_ms`. The callback frees itself after running.
pub fn set_timeout_once<F>(delay_ms: u32, f: F) -> Result<i32, JsValue>
where
    F: FnOnce() + 'static,
{
    let callback = Closure::once_into_js(f);
    window()?.set_timeout_with_callback_and_timeout_and_arguments_0(
        callback.unchecked_ref(),
        delay_ms.min(i32::MAX as u32) as i32,
    )
}

struct LoopShared {
    /// Pending requestAnimationFrame id
    pending: Cell<Option<i32>>,
    stopped: Cell<bool>,
}

/// requestAnimationFrame loop around a [`FrameHandler`]; cancelled on drop
pub struct AnimationLoop {
    shared: Rc<LoopShared>,
}

impl AnimationLoop {
    pub fn start<H: FrameHandler + 'static>(handler: Rc<RefCell<H>>) -> Result<Self, JsValue> {
        let shared = Rc::new(LoopShared {
            pending: Cell::new(None),
            stopped: Cell::new(false),
        });
        schedule_frame(shared.clone(), handler)?;
        Ok(Self { shared })
    }
}

impl Drop for AnimationLoop {
    fn drop(&mut self) {
        self.shared.stopped.set(true);
        if let (Some(id), Some(window)) = (self.shared.pending.take(), web_sys::window()) {
            let _ = window.cancel_animation_frame(id);
        }
    }
}

fn schedule_frame<H: FrameHandler + 'static>(
    shared: Rc<LoopShared>,
    handler: Rc<RefCell<H>>,
) -> Result<(), JsValue> {
    let next = shared.clone();
    let callback = Closure::once_into_js(move |now_ms: f64| {
        next.pending.set(None);
        if next.stopped.get() {
            return;
        }
        let control = handler.borrow_mut().on_frame(now_ms);
        if control == LoopControl::Stop {
            next.stopped.set(true);
            return;
        }
        if let Err(e) = schedule_frame(next, handler) {
            log::error!("Failed to schedule frame: {:?}", e);
        }
    });
    let id = window()?.request_animation_frame(callback.unchecked_ref())?;
    shared.pending.set(Some(id));
    Ok(())
}

/// Page is in the background (`document.hidden`)
pub fn page_hidden() -> bool {
    web_sys::window()
        .and_then(|w| w.document())
        .map(|d| d.hidden())
        .unwrap_or(false)
}

/// Fetch an image through an anonymous-CORS `<img>` and read back its pixels
pub async fn load_land_mask(url: &str) -> Result<LandMask, JsValue> {
    let image = HtmlImageElement::new()?;
    image.set_cross_origin(Some("anonymous"));

    let loaded = js_sys::Promise::new(&mut |resolve, reject| {
        image.set_onload(Some(&resolve));
        image.set_onerror(Some(&reject));
    });
    image.set_src(url);
    let result = JsFuture::from(loaded).await;
    image.set_onload(None);
    image.set_onerror(None);
    result.map_err(|_| JsValue::from_str(&format!("failed to load {url}")))?;

    let (width, height) = (image.natural_width(), image.natural_height());
    let document = window()?
        .document()
        .ok_or_else(|| JsValue::from_str("no document"))?;
    let canvas: HtmlCanvasElement = document.create_element("canvas")?.dyn_into()?;
    canvas.set_width(width);
    canvas.set_height(height);
    let ctx: CanvasRenderingContext2d = canvas
        .get_context("2d")?
        .ok_or_else(|| JsValue::from_str("no 2d context"))?
        .dyn_into()?;
    ctx.draw_image_with_html_image_element(&image, 0.0, 0.0)?;
    let pixels = ctx.get_image_data(0.0, 0.0, width as f64, height as f64)?;

    LandMask::from_rgba(width, height, pixels.data().0)
        .map_err(|e| JsValue::from_str(&e.to_string()))
}
