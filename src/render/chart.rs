use anyhow::Result;
use image::{Rgba, RgbaImage};

use super::canvas::{draw_line, fill_rect, fill_span, Rect};
use super::text::TextOverlay;
use crate::audio::notes::Note;
use crate::audio::spectrum::Spectrum;
use crate::config::{DisplayConfig, StyleConfig, VisualizerConfig};

const Y_TICK_STEP: f32 = 0.2;
const X_TICK_TARGET: f32 = 6.0;

/// Draws one spectrum frame: fixed axes, filled trace and note labels.
///
/// Holds only configuration and the font, so rendering a frame never
/// depends on earlier frames.
pub struct ChartRenderer {
    display: DisplayConfig,
    style: StyleConfig,
    text: TextOverlay,
    width: u32,
    height: u32,
    plot: Rect,
}

impl ChartRenderer {
    pub fn new(config: &VisualizerConfig) -> Result<Self> {
        let (width, height) = config.display.pixel_size();
        let s = config.display.scale;
        let [left, right, top, bottom] = config.style.margins.map(|m| (m as f32 * s).round() as i32);
        let plot = Rect {
            left,
            top,
            right: width as i32 - right,
            bottom: height as i32 - bottom,
        };

        Ok(Self {
            display: config.display.clone(),
            style: config.style.clone(),
            text: TextOverlay::new()?,
            width,
            height,
            plot,
        })
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn plot_area(&self) -> Rect {
        self.plot
    }

    pub fn freq_to_x(&self, freq: f32) -> f32 {
        let span = self.display.freq_max - self.display.freq_min;
        self.plot.left as f32 + (freq - self.display.freq_min) / span * self.plot.width() as f32
    }

    pub fn magnitude_to_y(&self, magnitude: f32) -> f32 {
        self.plot.bottom as f32 - magnitude * self.plot.height() as f32
    }

    fn x_to_freq(&self, x: f32) -> f32 {
        let span = self.display.freq_max - self.display.freq_min;
        self.display.freq_min + (x - self.plot.left as f32) / self.plot.width() as f32 * span
    }

    /// `spectrum` must already be normalized to the clip-wide constant.
    pub fn render(&self, spectrum: &Spectrum, grid: &[f32], notes: &[Note]) -> RgbaImage {
        let [r, g, b] = self.style.paper_color;
        let mut img = RgbaImage::from_pixel(self.width, self.height, Rgba([r, g, b, 255]));

        let [r, g, b] = self.style.plot_color;
        fill_rect(&mut img, self.plot, [r, g, b, 255]);

        let x_ticks = self.x_ticks();
        self.draw_grid(&mut img, &x_ticks);
        self.draw_trace(&mut img, spectrum, grid);
        self.draw_axes(&mut img, &x_ticks);
        self.draw_notes(&mut img, notes);

        img
    }

    fn x_ticks(&self) -> Vec<f32> {
        let step = nice_step((self.display.freq_max - self.display.freq_min) / X_TICK_TARGET);
        let first = (self.display.freq_min / step).ceil() as i64;
        let last = (self.display.freq_max / step).floor() as i64;
        (first..=last).map(|k| k as f32 * step).collect()
    }

    fn draw_grid(&self, img: &mut RgbaImage, x_ticks: &[f32]) {
        let width = self.display.scale.max(1.0);
        let color = self.style.grid_color;
        for &freq in x_ticks {
            let x = self.freq_to_x(freq);
            draw_line(
                img,
                (x, self.plot.top as f32),
                (x, self.plot.bottom as f32),
                width,
                color,
                self.plot,
            );
        }
        for k in 0..=((1.0 / Y_TICK_STEP).round() as i32) {
            let y = self.magnitude_to_y(k as f32 * Y_TICK_STEP);
            draw_line(
                img,
                (self.plot.left as f32, y),
                (self.plot.right as f32, y),
                width,
                color,
                self.plot,
            );
        }
    }

    fn draw_trace(&self, img: &mut RgbaImage, spectrum: &Spectrum, grid: &[f32]) {
        let len = spectrum.magnitudes.len().min(grid.len());
        if len == 0 {
            return;
        }
        let magnitudes = &spectrum.magnitudes[..len];
        let grid = &grid[..len];

        // area under the curve, one column at a time
        let baseline = self.magnitude_to_y(0.0).round() as i32;
        for x in self.plot.left..self.plot.right {
            let freq = self.x_to_freq(x as f32 + 0.5);
            if freq < grid[0] || freq > grid[len - 1] {
                continue;
            }
            let magnitude = interpolate(grid, magnitudes, freq).clamp(0.0, 1.0);
            let top = self.magnitude_to_y(magnitude).round() as i32;
            fill_span(img, x, top, baseline, self.style.fill_color, self.plot);
        }

        // outline, from the last bin left of the axis to the first bin right of it
        let start = grid
            .iter()
            .rposition(|&f| f < self.display.freq_min)
            .unwrap_or(0);
        let end = grid
            .iter()
            .position(|&f| f > self.display.freq_max)
            .unwrap_or(len - 1);
        let line_width = self.style.line_width * self.display.scale;
        for i in start..end {
            let from = (self.freq_to_x(grid[i]), self.magnitude_to_y(magnitudes[i]));
            let to = (self.freq_to_x(grid[i + 1]), self.magnitude_to_y(magnitudes[i + 1]));
            draw_line(img, from, to, line_width, self.style.line_color, self.plot);
        }
    }

    fn draw_axes(&self, img: &mut RgbaImage, x_ticks: &[f32]) {
        let s = self.display.scale;
        let size = self.style.font_size * s;
        let color = self.style.text_color;
        let full = Rect::of_image(img);

        let x_step = x_ticks.windows(2).map(|w| w[1] - w[0]).next().unwrap_or(1.0);
        for &freq in x_ticks {
            let label = format_tick(freq, x_step);
            let cy = self.plot.bottom as f32 + size * 0.9;
            self.text
                .composite_centered(img, &label, self.freq_to_x(freq), cy, size, color);
        }

        for k in 0..=((1.0 / Y_TICK_STEP).round() as i32) {
            let value = k as f32 * Y_TICK_STEP;
            let label = format_tick(value, Y_TICK_STEP);
            let w = self.text.measure_width(&label, size);
            let cx = self.plot.left as f32 - size * 0.4 - w / 2.0;
            self.text
                .composite_centered(img, &label, cx, self.magnitude_to_y(value), size, color);
        }

        let title_size = size * 17.0 / 12.0;
        self.text.composite_centered(
            img,
            &self.display.title,
            self.plot.left as f32 + self.text.measure_width(&self.display.title, title_size) / 2.0,
            self.plot.top as f32 / 2.0,
            title_size,
            color,
        );

        let x_title_y = (self.plot.bottom as f32 + size * 2.4).min(full.bottom as f32 - size * 0.6);
        self.text.composite_centered(
            img,
            &self.display.x_title,
            (self.plot.left + self.plot.right) as f32 / 2.0,
            x_title_y,
            size,
            color,
        );

        let widest_tick = self.text.measure_width("0.8", size);
        let y_title_x = (self.plot.left as f32 - widest_tick - size * 1.4).max(size * 0.6);
        self.text.composite_vertical(
            img,
            &self.display.y_title,
            y_title_x,
            (self.plot.top + self.plot.bottom) as f32 / 2.0,
            size,
            color,
        );
    }

    fn draw_notes(&self, img: &mut RgbaImage, notes: &[Note]) {
        let size = self.style.note_font_size * self.display.scale;
        for note in notes {
            let x = self.freq_to_x(note.frequency + self.display.label_offset_hz);
            let y = self.magnitude_to_y(note.magnitude);
            self.text
                .composite_centered(img, &note.name, x, y, size, self.style.text_color);
        }
    }
}

/// Linear interpolation of `values` sampled at ascending `xs`.
fn interpolate(xs: &[f32], values: &[f32], x: f32) -> f32 {
    let hi = xs.partition_point(|&v| v < x);
    if hi == 0 {
        return values[0];
    }
    if hi >= xs.len() {
        return values[xs.len() - 1];
    }
    let lo = hi - 1;
    let span = xs[hi] - xs[lo];
    if span <= 0.0 {
        return values[hi];
    }
    let t = (x - xs[lo]) / span;
    values[lo] + (values[hi] - values[lo]) * t
}

/// 1, 2 or 5 times a power of ten, closest above `raw`.
fn nice_step(raw: f32) -> f32 {
    if !(raw > 0.0) {
        return 1.0;
    }
    let magnitude = 10f32.powf(raw.log10().floor());
    let norm = raw / magnitude;
    let nice = if norm < 1.5 {
        1.0
    } else if norm < 3.0 {
        2.0
    } else if norm < 7.0 {
        5.0
    } else {
        10.0
    };
    nice * magnitude
}

fn format_tick(value: f32, step: f32) -> String {
    let decimals = (-step.log10().floor()).max(0.0) as usize;
    let text = format!("{:.*}", decimals, value);
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        text
    }
}
