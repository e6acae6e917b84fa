// Browser-side owner of the visualizer: wires the poller, renderer and DOM
// controls to the animation core.
use wasm_bindgen::prelude::*;
use web_sys::{window, HtmlCanvasElement};
use tracing::{debug, info};

use crate::config::VisConfig;
use crate::network::Poller;
use crate::render::{Renderer, Scene};
use crate::ui::{Slider, Status, UI};
use crate::utils;

use super::{Step, Visualizer};

#[wasm_bindgen]
pub struct VisClient {
    visualizer: Visualizer<Scene>,
    renderer: Renderer,
    poller: Poller,
    ui: UI,
    slider: Slider,
    last_status: Option<Status>,
    closed_reported: bool,
}

#[wasm_bindgen]
impl VisClient {
    pub fn new(canvas_id: &str, options: JsValue) -> Result<VisClient, JsValue> {
        let window = window().ok_or("No window")?;
        let document = window.document().ok_or("No document")?;
        let canvas = document
            .get_element_by_id(canvas_id)
            .ok_or("Canvas not found")?
            .dyn_into::<HtmlCanvasElement>()?;

        let config: VisConfig = if options.is_undefined() || options.is_null() {
            VisConfig::default()
        } else {
            serde_wasm_bindgen::from_value(options)?
        };

        // Set canvas size
        let width = window.inner_width()?.as_f64().unwrap_or(800.0);
        let height = window.inner_height()?.as_f64().unwrap_or(600.0);
        canvas.set_width(width as u32);
        canvas.set_height(height as u32);

        let renderer = Renderer::new(canvas)?;
        let poller = Poller::new(&config.state_url, config.poll_interval_ms);
        info!(url = %config.state_url, "visualizer ready");

        Ok(Self {
            visualizer: Visualizer::new(config, Scene::new()),
            renderer,
            poller,
            ui: UI::new(document),
            slider: Slider::new(0.0),
            last_status: None,
            closed_reported: false,
        })
    }

    /// "step" control: redisplay the next stored frame or fetch a new one.
    pub fn step(&mut self) {
        match self.visualizer.step_forward() {
            Step::Redisplay(frame) => debug!(frame, "step forward"),
            Step::NeedsFetch => {
                if !self.poller.fetch() {
                    debug!("step ignored, server closed");
                }
            }
        }
    }

    /// "back" control.
    pub fn back(&mut self) {
        if self.visualizer.step_back() {
            debug!(frame = self.visualizer.cursor(), "step back");
        }
    }

    /// "ready" checkbox.
    pub fn set_ready(&mut self, ready: bool) -> Result<(), JsValue> {
        self.poller.set_ready(ready)
    }

    /// Range control; returns the orientation (true = forward).
    pub fn slide(&mut self, value: f64) -> bool {
        let forward = self.slider.update(value);
        debug!(value, forward, "slider moved");
        forward
    }

    pub fn frame(&self) -> usize {
        self.visualizer.cursor()
    }

    pub fn frames(&self) -> usize {
        self.visualizer.store().len()
    }

    pub fn is_running(&self) -> bool {
        self.visualizer.is_running()
    }

    pub fn is_server_closed(&self) -> bool {
        self.poller.gate().is_closed()
    }
}

// Non-WASM methods (not exposed to JS)
impl VisClient {
    /// Main update method called from the animation frame loop.
    pub fn update(&mut self) {
        let now = utils::now();

        // Snapshots that arrived since the last frame, in arrival order
        for snapshot in self.poller.drain() {
            self.visualizer.parse_data(snapshot);
        }

        self.visualizer.tick(now);
        self.renderer.draw(self.visualizer.stage(), self.visualizer.config());

        let status = Status {
            frame: self.visualizer.cursor(),
            frames: self.visualizer.store().len(),
            queued: self.visualizer.queue().len(),
            server_closed: self.poller.gate().is_closed(),
        };
        if self.last_status != Some(status) {
            self.ui.update_status(&status);
            self.last_status = Some(status);
        }

        if status.server_closed && !self.closed_reported {
            self.closed_reported = true;
            self.ui.clear_ready();
            info!(frames = status.frames, "server closed, view frozen");
        }
    }
}
