// WASM client entry point for puddle-vis
// Polls the board server and animates droplets between successive states.

use wasm_bindgen::prelude::*;
use std::rc::Rc;
use std::cell::RefCell;
use web_sys::{window, HtmlButtonElement, HtmlCanvasElement, HtmlInputElement, KeyboardEvent};
use tracing::{debug, error};
use tracing_subscriber::filter::LevelFilter;

// Module structure - each module handles a specific concern
pub mod config;   // Layout, timing and polling settings
pub mod game;     // Snapshot store, registry, reconciler, animation queue
pub mod network;  // HTTP polling of the state endpoint
pub mod render;   // Sprite stage, tweens, canvas drawing
mod ui;           // DOM controls and status line
pub mod utils;    // Helper functions, LERP, console logging

pub use game::{VisClient, Visualizer};

/// Initialize panic hook and console logging
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
    utils::init_logging(LevelFilter::DEBUG);
}

/// Handle exposed to JS; owns the client and its event handlers
#[wasm_bindgen]
pub struct VisualizerWrapper {
    client: Rc<RefCell<VisClient>>,
}

#[wasm_bindgen]
impl VisualizerWrapper {
    /// Create a visualizer drawing into `canvas_id`. `options` may override
    /// any configuration field, e.g. `{ stateUrl: "/state", cellSize: 32 }`.
    #[wasm_bindgen(constructor)]
    pub fn new(canvas_id: &str, options: JsValue) -> Result<VisualizerWrapper, JsValue> {
        init();

        let client = VisClient::new(canvas_id, options)?;
        let client_rc = Rc::new(RefCell::new(client));

        // Setup animation loop
        setup_animation_loop(client_rc.clone())?;

        // Setup toolbar controls
        setup_controls(client_rc.clone())?;

        // Setup keypress logging
        setup_key_handler()?;

        // Setup canvas resize handler
        setup_resize_handler(canvas_id)?;

        Ok(VisualizerWrapper { client: client_rc })
    }

    /// Same as the "step" button
    pub fn step(&self) {
        self.client.borrow_mut().step();
    }

    /// Same as the "back" button
    pub fn back(&self) {
        self.client.borrow_mut().back();
    }

    /// Same as the "ready" checkbox
    pub fn set_ready(&self, ready: bool) -> Result<(), JsValue> {
        self.client.borrow_mut().set_ready(ready)
    }

    pub fn frame(&self) -> usize {
        self.client.borrow().frame()
    }

    pub fn frames(&self) -> usize {
        self.client.borrow().frames()
    }

    pub fn is_server_closed(&self) -> bool {
        self.client.borrow().is_server_closed()
    }
}

fn setup_animation_loop(client: Rc<RefCell<VisClient>>) -> Result<(), JsValue> {
    let window = window().ok_or("No window")?;

    // Create animation frame closure
    let f: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
    let g = f.clone();

    *g.borrow_mut() = Some(Closure::wrap(Box::new(move || {
        // Network callbacks only queue snapshots, so this borrow never clashes
        match client.try_borrow_mut() {
            Ok(mut client) => client.update(),
            Err(_) => debug!("frame skipped: client busy"),
        }

        // Request next frame
        if let (Some(win), Some(cb)) = (web_sys::window(), f.borrow().as_ref()) {
            if let Err(e) = win.request_animation_frame(cb.as_ref().unchecked_ref()) {
                error!("Failed to request animation frame: {:?}", e);
            }
        }
    }) as Box<dyn FnMut()>));

    // Start the loop
    if let Some(cb) = g.borrow().as_ref() {
        window.request_animation_frame(cb.as_ref().unchecked_ref())?;
    }

    Ok(())
}

fn setup_controls(client: Rc<RefCell<VisClient>>) -> Result<(), JsValue> {
    let window = window().ok_or("No window")?;
    let document = window.document().ok_or("No document")?;

    let back = document
        .get_element_by_id("back")
        .ok_or("back button not found")?
        .dyn_into::<HtmlButtonElement>()?;
    let step = document
        .get_element_by_id("step")
        .ok_or("step button not found")?
        .dyn_into::<HtmlButtonElement>()?;
    let ready = document
        .get_element_by_id("ready")
        .ok_or("ready checkbox not found")?
        .dyn_into::<HtmlInputElement>()?;
    let slider = document
        .get_element_by_id("slider")
        .ok_or("slider not found")?
        .dyn_into::<HtmlInputElement>()?;

    // Back button click
    {
        let client = client.clone();
        let closure = Closure::wrap(Box::new(move |_| {
            client.borrow_mut().back();
        }) as Box<dyn FnMut(JsValue)>);
        back.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref())?;
        closure.forget();
    }

    // Step button click
    {
        let client = client.clone();
        let closure = Closure::wrap(Box::new(move |_| {
            client.borrow_mut().step();
        }) as Box<dyn FnMut(JsValue)>);
        step.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref())?;
        closure.forget();
    }

    // Ready checkbox
    {
        let client = client.clone();
        let input = ready.clone();
        let closure = Closure::wrap(Box::new(move |_| {
            if let Err(e) = client.borrow_mut().set_ready(input.checked()) {
                error!("Failed to toggle polling: {:?}", e);
            }
        }) as Box<dyn FnMut(JsValue)>);
        ready.add_event_listener_with_callback("change", closure.as_ref().unchecked_ref())?;
        closure.forget();
    }

    // Slider
    {
        let client = client.clone();
        let input = slider.clone();
        client.borrow_mut().slide(input.value_as_number());
        let closure = Closure::wrap(Box::new(move |_| {
            client.borrow_mut().slide(input.value_as_number());
        }) as Box<dyn FnMut(JsValue)>);
        slider.add_event_listener_with_callback("input", closure.as_ref().unchecked_ref())?;
        closure.forget();
    }

    Ok(())
}

fn setup_key_handler() -> Result<(), JsValue> {
    let window = window().ok_or("No window")?;
    let document = window.document().ok_or("No document")?;

    let closure = Closure::wrap(Box::new(move |event: KeyboardEvent| {
        debug!(key = %event.key(), "keypress");
    }) as Box<dyn FnMut(_)>);

    document.add_event_listener_with_callback("keypress", closure.as_ref().unchecked_ref())?;
    closure.forget();

    Ok(())
}

/// Resize the canvas when the browser window is resized.
fn setup_resize_handler(canvas_id: &str) -> Result<(), JsValue> {
    let win = window().ok_or("No window")?;
    let id = canvas_id.to_string();

    let closure = Closure::wrap(Box::new(move || {
        if let (Some(win), Some(doc)) = (web_sys::window(), web_sys::window().and_then(|w| w.document())) {
            if let Some(canvas_el) = doc.get_element_by_id(&id) {
                if let Ok(canvas) = canvas_el.dyn_into::<HtmlCanvasElement>() {
                    if let Ok(w) = win.inner_width() {
                        canvas.set_width(w.as_f64().unwrap_or(800.0) as u32);
                    }
                    if let Ok(h) = win.inner_height() {
                        canvas.set_height(h.as_f64().unwrap_or(600.0) as u32);
                    }
                }
            }
        }
    }) as Box<dyn FnMut()>);

    win.add_event_listener_with_callback("resize", closure.as_ref().unchecked_ref())?;
    closure.forget();

    Ok(())
}
