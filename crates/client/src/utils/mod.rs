// Helper utilities, LERP, math functions, logging
use std::fmt::{self, Write};

use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;

/// Linear interpolation between two values
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Clamp a value between min and max
pub fn clamp(value: f32, min: f32, max: f32) -> f32 {
    value.max(min).min(max)
}

/// Get the current high-precision timestamp in milliseconds
pub fn now() -> f64 {
    web_sys::window()
        .and_then(|w| w.performance())
        .map(|p| p.now())
        .unwrap_or_else(js_sys::Date::now)
}

/// Stable, well-spread colour for a droplet id.
pub fn color_for(id: u64) -> (u8, u8, u8) {
    // golden-angle hue walk
    let hue = (id as f32 * 137.508) % 360.0;
    hsl_to_rgb(hue, 0.65, 0.5)
}

fn hsl_to_rgb(h: f32, s: f32, l: f32) -> (u8, u8, u8) {
    let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
    let hp = h / 60.0;
    let x = c * (1.0 - (hp % 2.0 - 1.0).abs());
    let (r, g, b) = match hp as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let m = l - c / 2.0;
    let to_byte = |v: f32| (clamp(v + m, 0.0, 1.0) * 255.0).round() as u8;
    (to_byte(r), to_byte(g), to_byte(b))
}

/// Forwards tracing events to the browser console.
struct ConsoleLayer;

#[derive(Default)]
struct ConsoleLine {
    message: String,
    fields: String,
}

impl Visit for ConsoleLine {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.message, "{:?}", value);
        } else {
            let _ = write!(self.fields, " {}={:?}", field.name(), value);
        }
    }
}

impl<S: Subscriber> Layer<S> for ConsoleLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut line = ConsoleLine::default();
        event.record(&mut line);
        let meta = event.metadata();
        let text = format!("{} {}: {}{}", meta.level(), meta.target(), line.message, line.fields);
        match *meta.level() {
            Level::ERROR => web_sys::console::error_1(&text.into()),
            Level::WARN => web_sys::console::warn_1(&text.into()),
            _ => web_sys::console::log_1(&text.into()),
        }
    }
}

/// Install the console subscriber. Safe to call more than once.
pub fn init_logging(level: LevelFilter) {
    let _ = tracing_subscriber::registry()
        .with(level)
        .with(ConsoleLayer)
        .try_init();
}
