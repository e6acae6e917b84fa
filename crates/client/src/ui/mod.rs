// DOM manipulation - status line and control state
use web_sys::{Document, Element, HtmlInputElement};
use wasm_bindgen::JsCast;

pub struct UI {
    document: Document,
}

impl UI {
    pub fn new(document: Document) -> Self {
        Self { document }
    }

    fn get_el(&self, id: &str) -> Option<Element> {
        self.document.get_element_by_id(id)
    }

    /// Update the frame / queue status line.
    pub fn update_status(&self, status: &Status) {
        if let Some(el) = self.get_el("frame") {
            el.set_inner_html(&status.frame_label());
        }
        if let Some(el) = self.get_el("queued") {
            el.set_inner_html(&status.queued.to_string());
        }
        if let Some(el) = self.get_el("serverState") {
            el.set_inner_html(if status.server_closed { "closed" } else { "open" });
        }
    }

    /// Uncheck the ready box once polling can no longer run.
    pub fn clear_ready(&self) {
        if let Some(input) = self.get_el("ready") {
            if let Ok(input) = input.dyn_into::<HtmlInputElement>() {
                input.set_checked(false);
            }
        }
    }
}

/// Snapshot of what the status line shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Status {
    pub frame: usize,
    pub frames: usize,
    pub queued: usize,
    pub server_closed: bool,
}

impl Status {
    pub fn frame_label(&self) -> String {
        if self.frames == 0 {
            "-".to_string()
        } else {
            format!("{} / {}", self.frame + 1, self.frames)
        }
    }
}

/// Range control orientation: forward while the value grows, backward while
/// it shrinks.
#[derive(Debug, Clone, Copy)]
pub struct Slider {
    last: f64,
    forward: bool,
}

impl Slider {
    pub fn new(initial: f64) -> Self {
        Self {
            last: initial,
            forward: true,
        }
    }

    /// Record a new value and return the orientation.
    pub fn update(&mut self, value: f64) -> bool {
        if value > self.last {
            self.forward = true;
        } else if value < self.last {
            self.forward = false;
        }
        self.last = value;
        self.forward
    }

    pub fn is_forward(&self) -> bool {
        self.forward
    }
}
