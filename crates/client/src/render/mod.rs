// Canvas rendering - board grid and droplet sprites
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement};
use glam::Vec2;
use std::f64::consts::TAU;

use crate::config::VisConfig;

mod stage;
mod tween;

pub use stage::{Circle, Scene, Sprite, SpriteId, Stage, TransitionId};
pub use tween::{Ease, Tween};

pub struct Renderer {
    canvas: HtmlCanvasElement,
    ctx: CanvasRenderingContext2d,
}

impl Renderer {
    pub fn new(canvas: HtmlCanvasElement) -> Result<Self, JsValue> {
        let ctx = canvas
            .get_context("2d")?
            .ok_or("Failed to get 2d context")?
            .dyn_into::<CanvasRenderingContext2d>()?;

        Ok(Self { canvas, ctx })
    }

    #[inline(always)]
    pub fn width(&self) -> f32 {
        self.canvas.width() as f32
    }

    #[inline(always)]
    pub fn height(&self) -> f32 {
        self.canvas.height() as f32
    }

    #[inline]
    pub fn clear(&self, background: &str) {
        self.ctx.set_fill_style_str(background);
        self.ctx.fill_rect(0.0, 0.0, self.width() as f64, self.height() as f64);
    }

    /// Draw one full frame of the scene.
    pub fn draw(&self, scene: &Scene, config: &VisConfig) {
        self.clear("#fafafa");
        if config.show_grid {
            self.draw_grid(config.cell_size, config.y_offset);
        }
        // Circles are centred in their grid cell.
        let half_cell = Vec2::splat(config.cell_size / 2.0);
        for (_, sprite) in scene.sprites() {
            if sprite.visible {
                self.draw_sprite(sprite, half_cell);
            }
        }
    }

    fn draw_grid(&self, cell_size: f32, y_offset: f32) {
        if cell_size < 2.0 {
            return;
        }
        let width = self.width();
        let height = self.height();

        self.ctx.set_stroke_style_str("rgba(0,0,0,0.12)");
        self.ctx.set_line_width(1.0);
        self.ctx.begin_path();

        let cols = (width / cell_size).ceil() as i32;
        for i in 0..=cols {
            let x = (i as f32 * cell_size).round() + 0.5;
            self.ctx.move_to(x as f64, y_offset as f64);
            self.ctx.line_to(x as f64, height as f64);
        }
        let rows = ((height - y_offset).max(0.0) / cell_size).ceil() as i32;
        for i in 0..=rows {
            let y = (y_offset + i as f32 * cell_size).round() + 0.5;
            self.ctx.move_to(0.0, y as f64);
            self.ctx.line_to(width as f64, y as f64);
        }

        self.ctx.stroke();
    }

    fn draw_sprite(&self, sprite: &Sprite, half_cell: Vec2) {
        let (r, g, b) = sprite.color;
        self.ctx.set_fill_style_str(&format!("rgb({},{},{})", r, g, b));
        for circle in &sprite.circles {
            if circle.radius < 0.5 {
                continue; // Too small to see
            }
            let center = sprite.position + circle.offset + half_cell;
            self.ctx.begin_path();
            self.ctx
                .arc(center.x as f64, center.y as f64, circle.radius as f64, 0.0, TAU)
                .ok();
            self.ctx.fill();
        }
    }
}
