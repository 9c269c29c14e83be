//! Arc globe entry point
//!
//! On the web: mounts the globe on `#globe`, wires the counters and the logo
//! carousel, and runs the frame loop. Natively: a headless preview of the
//! simulation.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_globe {
    use std::cell::RefCell;
    use std::rc::{Rc, Weak};

    use glam::Vec2;
    use wasm_bindgen::JsCast;
    use wasm_bindgen::prelude::*;
    use web_sys::{
        Document, Element, HtmlCanvasElement, HtmlElement, IntersectionObserver,
        IntersectionObserverEntry, IntersectionObserverInit, PointerEvent,
    };

    use arcglobe::platform::web::{
        AnimationLoop, Interval, Listener, load_land_mask, page_hidden, set_timeout_once,
    };
    use arcglobe::platform::{FrameHandler, LoopControl, PageExit};
    use arcglobe::renderer::GlobeRenderState;
    use arcglobe::sim::{FrameInput, GlobeEvent, GlobeState, tick};
    use arcglobe::widgets::counter::{VISIBILITY_THRESHOLD, parse_start, parse_target};
    use arcglobe::widgets::{Carousel, CarouselConfig, Counter, CounterTick};
    use arcglobe::{OrbitCamera, Settings};

    /// Globe scene: simulation, camera and GPU state for one canvas
    struct Session {
        state: GlobeState,
        camera: OrbitCamera,
        render_state: GlobeRenderState,
        canvas: HtmlCanvasElement,
        max_pixel_ratio: f64,
    }

    impl Session {
        /// Match the drawing buffer to the canvas layout size
        fn resize(&mut self) {
            let (width, height, client_w, client_h) =
                canvas_size(&self.canvas, self.max_pixel_ratio);
            self.canvas.set_width(width);
            self.canvas.set_height(height);
            self.render_state.resize(width, height);
            self.camera.set_viewport(client_w, client_h);
        }

        fn log_events(events: &[GlobeEvent]) {
            for event in events {
                match event {
                    GlobeEvent::DotsPlaced { count, attempts } => {
                        log::info!("Placed {} land dots in {} attempts", count, attempts);
                    }
                    GlobeEvent::ArcSpawned(id) => log::trace!("Arc {} spawned", id),
                    GlobeEvent::ArcRemoved(id) => log::trace!("Arc {} removed", id),
                }
            }
        }

        fn render(&mut self) {
            match self.render_state.render(&self.state, &self.camera) {
                Ok(_) => {}
                Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                    let (w, h) = self.render_state.size;
                    self.render_state.resize(w, h);
                }
                Err(wgpu::SurfaceError::OutOfMemory) => {
                    log::error!("Out of memory!");
                }
                Err(e) => log::warn!("Render error: {:?}", e),
            }
        }
    }

    impl FrameHandler for Session {
        fn on_frame(&mut self, now_ms: f64) -> LoopControl {
            let input = if page_hidden() {
                FrameInput::hidden(now_ms)
            } else {
                FrameInput::visible(now_ms)
            };
            let dt = tick(&mut self.state, &input);
            self.camera.update(dt);

            let events = self.state.drain_events();
            Self::log_events(&events);
            self.render_state.apply_events(&self.state, &events);

            self.render();
            LoopControl::Continue
        }
    }

    /// Drawing buffer size (device pixels) and layout size (CSS pixels)
    fn canvas_size(canvas: &HtmlCanvasElement, max_pixel_ratio: f64) -> (u32, u32, f32, f32) {
        let dpr = web_sys::window()
            .map(|w| w.device_pixel_ratio())
            .unwrap_or(1.0)
            .min(max_pixel_ratio);
        let client_w = canvas.client_width().max(1);
        let client_h = canvas.client_height().max(1);
        let width = (client_w as f64 * dpr) as u32;
        let height = (client_h as f64 * dpr) as u32;
        (width.max(1), height.max(1), client_w as f32, client_h as f32)
    }

    fn viewport_width() -> f64 {
        web_sys::window()
            .and_then(|w| w.inner_width().ok())
            .and_then(|v| v.as_f64())
            .unwrap_or(0.0)
    }

    fn set_style(element: &HtmlElement, property: &str, value: &str) {
        let _ = element.style().set_property(property, value);
    }

    fn supports_webgpu() -> bool {
        web_sys::window()
            .and_then(|w| js_sys::Reflect::get(&w, &JsValue::from_str("navigator")).ok())
            .and_then(|nav| js_sys::Reflect::get(&nav, &JsValue::from_str("gpu")).ok())
            .is_some_and(|gpu| !gpu.is_undefined() && !gpu.is_null())
    }

    // ========================================================================
    // COUNTERS
    // ========================================================================

    /// One counter's running animation. Stops once its owner is torn down.
    struct CounterRun {
        element: HtmlElement,
        counter: Counter,
        tick_ms: u32,
        alive: Weak<()>,
    }

    fn step_counter(mut run: CounterRun) {
        if run.alive.upgrade().is_none() {
            return;
        }
        let tick = run.counter.tick();
        run.element
            .set_text_content(Some(&tick.value().to_string()));
        if let CounterTick::Continue(_) = tick {
            let delay = run.tick_ms;
            if let Err(e) = set_timeout_once(delay, move || step_counter(run)) {
                log::warn!("Counter timer failed: {:?}", e);
            }
        }
    }

    /// Starts a counter the first time it is half visible
    struct CounterWatch {
        observer: IntersectionObserver,
        _callback: Closure<dyn FnMut(js_sys::Array, IntersectionObserver)>,
    }

    impl Drop for CounterWatch {
        fn drop(&mut self) {
            self.observer.disconnect();
        }
    }

    fn watch_counter(
        element: HtmlElement,
        settings: &Settings,
        alive: Weak<()>,
    ) -> Result<Option<CounterWatch>, JsValue> {
        let raw = element.get_attribute("data-target").unwrap_or_default();
        let Some(target) = parse_target(&raw) else {
            log::warn!("Skipping counter with data-target {:?}", raw);
            return Ok(None);
        };

        let speed = settings.counter_speed;
        let tick_ms = settings.counter_tick_ms;
        let mut pending = Some(element.clone());
        let callback = Closure::<dyn FnMut(js_sys::Array, IntersectionObserver)>::new(
            move |entries: js_sys::Array, observer: IntersectionObserver| {
                let Ok(entry) = entries.get(0).dyn_into::<IntersectionObserverEntry>() else {
                    return;
                };
                if !entry.is_intersecting() {
                    return;
                }
                observer.disconnect();
                let Some(element) = pending.take() else {
                    return;
                };
                let counter = Counter::new(parse_start(&element.inner_text()), target, speed);
                log::debug!("Counting {} -> {}", counter.value(), counter.target());
                step_counter(CounterRun {
                    element,
                    counter,
                    tick_ms,
                    alive: alive.clone(),
                });
            },
        );

        let init = IntersectionObserverInit::new();
        init.set_threshold(&JsValue::from_f64(VISIBILITY_THRESHOLD));
        let observer =
            IntersectionObserver::new_with_options(callback.as_ref().unchecked_ref(), &init)?;
        observer.observe(&element);

        Ok(Some(CounterWatch {
            observer,
            _callback: callback,
        }))
    }

    // ========================================================================
    // CAROUSEL
    // ========================================================================

    struct CarouselDom {
        carousel: Carousel,
        container: HtmlElement,
        items: Vec<HtmlElement>,
        dots: Option<HtmlElement>,
        dot_listeners: Vec<Listener>,
    }

    impl CarouselDom {
        fn layout(&self) {
            let width = self.container.client_width() as f32;
            let item_width = self.carousel.item_width(width);
            for (i, item) in self.items.iter().enumerate() {
                set_style(item, "flex", &format!("0 0 {item_width}px"));
                set_style(item, "order", &self.carousel.slot_of(i).to_string());
            }
            self.mark_active_dot();
        }

        fn mark_active_dot(&self) {
            let Some(dots) = &self.dots else {
                return;
            };
            let Ok(buttons) = dots.query_selector_all("button") else {
                return;
            };
            let current = self.carousel.current_page() as u32;
            for i in 0..buttons.length() {
                let Some(button) = buttons.get(i).and_then(|n| n.dyn_into::<Element>().ok())
                else {
                    continue;
                };
                let _ = button.class_list().toggle_with_force("active", i == current);
            }
        }
    }

    /// Recreate one dot per page (after construction and page-count changes)
    fn rebuild_dots(dom: &Rc<RefCell<CarouselDom>>, document: &Document) -> Result<(), JsValue> {
        let mut d = dom.borrow_mut();
        d.dot_listeners.clear();
        let Some(dots) = d.dots.clone() else {
            return Ok(());
        };
        dots.set_inner_html("");

        let pages = if d.carousel.is_static() {
            0
        } else {
            d.carousel.page_count()
        };
        for page in 0..pages {
            let button = document.create_element("button")?;
            button.set_attribute("type", "button")?;
            button.set_attribute("aria-label", &format!("Page {}", page + 1))?;
            dots.append_child(&button)?;

            let weak = Rc::downgrade(dom);
            d.dot_listeners.push(Listener::new(&button, "click", move |_| {
                if let Some(dom) = weak.upgrade() {
                    let mut d = dom.borrow_mut();
                    d.carousel.go_to_page(page);
                    d.layout();
                }
            })?);
        }
        drop(d);
        dom.borrow().layout();
        Ok(())
    }

    /// A mounted `.clients-carousel`
    struct CarouselView {
        _dom: Rc<RefCell<CarouselDom>>,
        _autoplay: Option<Interval>,
        _listeners: Vec<Listener>,
    }

    fn mount_carousel(
        container: HtmlElement,
        config: &CarouselConfig,
        document: &Document,
    ) -> Result<CarouselView, JsValue> {
        let nodes = container.query_selector_all(":scope > *")?;
        let items: Vec<HtmlElement> = (0..nodes.length())
            .filter_map(|i| nodes.get(i))
            .filter_map(|n| n.dyn_into::<HtmlElement>().ok())
            .collect();

        set_style(&container, "display", "flex");
        set_style(&container, "overflow", "hidden");
        set_style(&container, "gap", &format!("{}px", config.margin));

        let dots = if config.dots {
            let dots: HtmlElement = document.create_element("div")?.dyn_into()?;
            dots.set_class_name("carousel-dots");
            if let Some(parent) = container.parent_node() {
                parent.insert_before(&dots, container.next_sibling().as_ref())?;
            }
            Some(dots)
        } else {
            None
        };

        let carousel = Carousel::new(config.clone(), items.len(), viewport_width());
        log::info!(
            "Carousel with {} items, {} per view",
            carousel.item_count(),
            carousel.per_view()
        );
        let dom = Rc::new(RefCell::new(CarouselDom {
            carousel,
            container: container.clone(),
            items,
            dots,
            dot_listeners: Vec::new(),
        }));
        rebuild_dots(&dom, document)?;

        let mut listeners = Vec::new();
        for (event, hovered) in [("mouseenter", true), ("mouseleave", false)] {
            let weak = Rc::downgrade(&dom);
            listeners.push(Listener::new(&container, event, move |_| {
                if let Some(dom) = weak.upgrade() {
                    dom.borrow_mut().carousel.set_hovered(hovered);
                }
            })?);
        }

        if let Some(window) = web_sys::window() {
            let weak = Rc::downgrade(&dom);
            let document = document.clone();
            listeners.push(Listener::new(&window, "resize", move |_| {
                let Some(dom) = weak.upgrade() else {
                    return;
                };
                let repaged = dom.borrow_mut().carousel.set_viewport_width(viewport_width());
                if repaged {
                    if let Err(e) = rebuild_dots(&dom, &document) {
                        log::warn!("Carousel dots failed: {:?}", e);
                    }
                } else {
                    dom.borrow().layout();
                }
            })?);
        }

        let autoplay = if config.autoplay {
            let weak = Rc::downgrade(&dom);
            Some(Interval::new(config.autoplay_timeout_ms, move || {
                if let Some(dom) = weak.upgrade() {
                    let mut d = dom.borrow_mut();
                    if d.carousel.autoplay_tick() {
                        d.layout();
                    }
                }
            })?)
        } else {
            None
        };

        Ok(CarouselView {
            _dom: dom,
            _autoplay: autoplay,
            _listeners: listeners,
        })
    }

    // ========================================================================
    // APP
    // ========================================================================

    /// Everything alive for the page; dropping it tears the page down
    struct App {
        _frame_loop: AnimationLoop,
        _listeners: Vec<Listener>,
        _counters: Vec<CounterWatch>,
        _carousels: Vec<CarouselView>,
        /// Counter animations run while this is alive
        _counter_token: Rc<()>,
    }

    fn setup_pointer_handlers(
        canvas: &HtmlCanvasElement,
        session: &Rc<RefCell<Session>>,
    ) -> Result<Vec<Listener>, JsValue> {
        set_style(canvas, "cursor", "grab");
        set_style(canvas, "touch-action", "none");

        let mut listeners = Vec::new();
        {
            let session = session.clone();
            let canvas_clone = canvas.clone();
            listeners.push(Listener::new(canvas, "pointerdown", move |event| {
                let Ok(event) = event.dyn_into::<PointerEvent>() else {
                    return;
                };
                let _ = canvas_clone.set_pointer_capture(event.pointer_id());
                set_style(&canvas_clone, "cursor", "grabbing");
                let pos = Vec2::new(event.client_x() as f32, event.client_y() as f32);
                session.borrow_mut().camera.pointer_down(pos);
            })?);
        }
        {
            let session = session.clone();
            listeners.push(Listener::new(canvas, "pointermove", move |event| {
                let Ok(event) = event.dyn_into::<PointerEvent>() else {
                    return;
                };
                let pos = Vec2::new(event.client_x() as f32, event.client_y() as f32);
                session.borrow_mut().camera.pointer_move(pos);
            })?);
        }
        for name in ["pointerup", "pointercancel"] {
            let session = session.clone();
            let canvas_clone = canvas.clone();
            listeners.push(Listener::new(canvas, name, move |_| {
                set_style(&canvas_clone, "cursor", "grab");
                session.borrow_mut().camera.pointer_up();
            })?);
        }
        Ok(listeners)
    }

    pub async fn run() {
        console_error_panic_hook::set_once();
        console_log::init_with_level(log::Level::Info).expect("Failed to init logger");

        log::info!("Arc globe starting...");

        let window = web_sys::window().expect("no window");
        let document = window.document().expect("no document");

        let canvas: HtmlCanvasElement = document
            .get_element_by_id("globe")
            .expect("no #globe canvas")
            .dyn_into()
            .expect("#globe is not a canvas");

        let settings = Settings::load(&canvas);
        let max_pixel_ratio = settings.quality.max_pixel_ratio();
        let (width, height, client_w, client_h) = canvas_size(&canvas, max_pixel_ratio);
        canvas.set_width(width);
        canvas.set_height(height);

        let backends = if supports_webgpu() {
            wgpu::Backends::BROWSER_WEBGPU
        } else {
            wgpu::Backends::GL
        };
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends,
            ..Default::default()
        });

        let surface = instance
            .create_surface(wgpu::SurfaceTarget::Canvas(canvas.clone()))
            .expect("Failed to create surface");

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .expect("Failed to get adapter");

        log::info!("Using adapter: {:?}", adapter.get_info().name);

        let render_state = GlobeRenderState::new(
            surface,
            &adapter,
            width,
            height,
            settings.quality.sphere_segments(),
        )
        .await
        .expect("Failed to create device");

        let seed = js_sys::Date::now() as u64;
        let mut camera = OrbitCamera::new(client_w / client_h);
        camera.set_viewport(client_w, client_h);
        camera.auto_rotate = settings.auto_rotate;
        camera.auto_rotate_speed = settings.auto_rotate_speed;

        let session = Rc::new(RefCell::new(Session {
            state: GlobeState::new(seed, &settings),
            camera,
            render_state,
            canvas: canvas.clone(),
            max_pixel_ratio,
        }));
        log::info!("Globe initialized with seed: {}", seed);

        let mut listeners = setup_pointer_handlers(&canvas, &session).expect("pointer handlers");
        {
            let session = session.clone();
            listeners.push(
                Listener::new(&window, "resize", move |_| session.borrow_mut().resize())
                    .expect("resize handler"),
            );
        }

        // Land dots arrive whenever the map does
        {
            let weak = Rc::downgrade(&session);
            let url = settings.land_map_url.clone();
            wasm_bindgen_futures::spawn_local(async move {
                match load_land_mask(&url).await {
                    Ok(mask) => {
                        if let Some(session) = weak.upgrade() {
                            session.borrow_mut().state.place_land_dots(&mask);
                        }
                    }
                    Err(e) => log::warn!("Land map unavailable, no dots: {:?}", e),
                }
            });
        }

        let counter_token = Rc::new(());
        let mut counters = Vec::new();
        if let Ok(nodes) = document.query_selector_all(".counter") {
            for i in 0..nodes.length() {
                let Some(element) = nodes.get(i).and_then(|n| n.dyn_into::<HtmlElement>().ok())
                else {
                    continue;
                };
                match watch_counter(element, &settings, Rc::downgrade(&counter_token)) {
                    Ok(Some(watch)) => counters.push(watch),
                    Ok(None) => {}
                    Err(e) => log::warn!("Counter setup failed: {:?}", e),
                }
            }
        }

        let mut carousels = Vec::new();
        if let Ok(nodes) = document.query_selector_all(".clients-carousel") {
            for i in 0..nodes.length() {
                let Some(container) =
                    nodes.get(i).and_then(|n| n.dyn_into::<HtmlElement>().ok())
                else {
                    continue;
                };
                match mount_carousel(container, &settings.carousel, &document) {
                    Ok(view) => carousels.push(view),
                    Err(e) => log::warn!("Carousel setup failed: {:?}", e),
                }
            }
        }

        // Restored from the back/forward cache: the viewport may have changed
        {
            let session = session.clone();
            listeners.push(
                Listener::new(&window, "pageshow", move |event| {
                    let restored = event
                        .dyn_ref::<web_sys::PageTransitionEvent>()
                        .is_some_and(|e| e.persisted());
                    if restored {
                        log::info!("Arc globe restored from page cache");
                        session.borrow_mut().resize();
                    }
                })
                .expect("pageshow handler"),
            );
        }

        let frame_loop = AnimationLoop::start(session).expect("Failed to start frame loop");

        let app = Rc::new(RefCell::new(Some(App {
            _frame_loop: frame_loop,
            _listeners: listeners,
            _counters: counters,
            _carousels: carousels,
            _counter_token: counter_token,
        })));

        // Teardown: dropping the app cancels the loop and every subscription.
        // A cached page keeps everything so it animates again when shown.
        let teardown = Closure::<dyn FnMut(web_sys::Event)>::new(move |event: web_sys::Event| {
            let persisted = event
                .dyn_ref::<web_sys::PageTransitionEvent>()
                .is_some_and(|e| e.persisted());
            let exit = PageExit::from_persisted(persisted);
            if !exit.releases_resources() {
                log::debug!("Page cached, keeping the globe alive");
                return;
            }
            if app.borrow_mut().take().is_some() {
                log::info!("Arc globe stopped");
            }
        });
        let _ = window.add_event_listener_with_callback("pagehide", teardown.as_ref().unchecked_ref());
        teardown.forget();

        log::info!("Arc globe running!");
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub async fn wasm_main() {
    wasm_globe::run().await;
}

#[cfg(not(target_arch = "wasm32"))]
mod preview {
    use arcglobe::platform::{FrameHandler, LoopControl, SteppedClock};
    use arcglobe::sim::{FrameInput, GlobeEvent, GlobeState, LandMask, MaskError, tick};
    use arcglobe::{OrbitCamera, QualityPreset, Settings, vec3_to_lat_lon};

    /// Seconds of simulated time
    const PREVIEW_SECS: f64 = 10.0;

    /// Headless frame handler that tallies the arc lifecycle
    struct HeadlessPreview {
        state: GlobeState,
        camera: OrbitCamera,
        spawned: usize,
        removed: usize,
        peak_arcs: usize,
    }

    impl FrameHandler for HeadlessPreview {
        fn on_frame(&mut self, now_ms: f64) -> LoopControl {
            let dt = tick(&mut self.state, &FrameInput::visible(now_ms));
            self.camera.update(dt);
            for event in self.state.drain_events() {
                match event {
                    GlobeEvent::ArcSpawned(id) => {
                        self.spawned += 1;
                        if let Some(arc) = self.state.arc(id) {
                            let (lat1, lon1) = vec3_to_lat_lon(arc.start());
                            let (lat2, lon2) = vec3_to_lat_lon(arc.end());
                            log::debug!(
                                "Arc {}: ({:.1}, {:.1}) -> ({:.1}, {:.1})",
                                id,
                                lat1,
                                lon1,
                                lat2,
                                lon2
                            );
                        }
                    }
                    GlobeEvent::ArcRemoved(_) => self.removed += 1,
                    GlobeEvent::DotsPlaced { .. } => {}
                }
            }
            self.peak_arcs = self.peak_arcs.max(self.state.arcs.len());
            LoopControl::Continue
        }
    }

    /// Map from disk, or a synthetic one with land north of the equator
    fn load_mask(path: Option<&str>) -> Result<LandMask, Box<dyn std::error::Error>> {
        if let Some(path) = path {
            log::info!("Loading land map {}", path);
            let image = image::open(path)?.to_rgba8();
            let (width, height) = image.dimensions();
            return Ok(LandMask::from_rgba(width, height, image.into_raw())?);
        }
        log::info!("No map given, using a synthetic half-land map");
        Ok(synthetic_mask(256, 128)?)
    }

    fn synthetic_mask(width: u32, height: u32) -> Result<LandMask, MaskError> {
        let mut rgba = Vec::with_capacity((width * height * 4) as usize);
        for y in 0..height {
            let land = y < height / 2;
            for _ in 0..width {
                if land {
                    rgba.extend_from_slice(&[120, 110, 60, 255]);
                } else {
                    rgba.extend_from_slice(&[10, 30, 90, 255]);
                }
            }
        }
        LandMask::from_rgba(width, height, rgba)
    }

    /// `arcglobe [MAP] [low|medium|high]`
    pub fn run() -> Result<(), Box<dyn std::error::Error>> {
        let mut args = std::env::args().skip(1);
        let path = args.next();
        let preset = match args.next() {
            Some(name) => QualityPreset::parse(&name)
                .ok_or_else(|| format!("unknown quality preset {name:?}"))?,
            None => QualityPreset::default(),
        };
        let settings = Settings::from_preset(preset);
        log::info!("Quality: {}", preset.as_str());

        let mask = load_mask(path.as_deref())?;
        log::info!("Land mask {}x{}", mask.width(), mask.height());

        let mut preview = HeadlessPreview {
            state: GlobeState::new(0x5eed, &settings),
            camera: OrbitCamera::new(16.0 / 9.0),
            spawned: 0,
            removed: 0,
            peak_arcs: 0,
        };
        let dots = preview.state.place_land_dots(&mask);
        log::info!("Placed {} land dots in {} attempts", dots.len(), dots.attempts);

        let mut clock = SteppedClock::sixty_hz();
        let frames = (PREVIEW_SECS * 1000.0 / clock.step_ms) as usize;
        let ran = clock.run(&mut preview, frames);

        log::info!(
            "{} of {} frames: {} arcs spawned, {} removed, {} live, peak {}",
            ran,
            preview.state.frame_count,
            preview.spawned,
            preview.removed,
            preview.state.arcs.len(),
            preview.peak_arcs
        );
        log::info!(
            "Camera azimuth after {:.0}s: {:.3} rad",
            PREVIEW_SECS,
            preview.camera.azimuth
        );
        Ok(())
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Arc globe (native) preview starting...");
    log::info!("The browser build runs with `trunk serve`");

    if let Err(e) = preview::run() {
        log::error!("Preview failed: {}", e);
        std::process::exit(1);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {}
