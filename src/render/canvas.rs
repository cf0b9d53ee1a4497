use image::{Rgba, RgbaImage};

/// Axis-aligned pixel rectangle, `right` and `bottom` exclusive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Rect {
    pub fn of_image(img: &RgbaImage) -> Self {
        Self {
            left: 0,
            top: 0,
            right: img.width() as i32,
            bottom: img.height() as i32,
        }
    }

    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.left && x < self.right && y >= self.top && y < self.bottom
    }
}

/// Alpha-blend `color` over the pixel at (x, y). `coverage` scales the alpha.
pub fn blend(img: &mut RgbaImage, x: i32, y: i32, color: [u8; 4], coverage: f32) {
    if x < 0 || y < 0 || x >= img.width() as i32 || y >= img.height() as i32 {
        return;
    }
    let a = (color[3] as f32 / 255.0) * coverage.clamp(0.0, 1.0);
    if a <= 0.0 {
        return;
    }
    let px = img.get_pixel_mut(x as u32, y as u32);
    let inv_a = 1.0 - a;
    for c in 0..3 {
        px[c] = (color[c] as f32 * a + px[c] as f32 * inv_a).round() as u8;
    }
    px[3] = 255;
}

pub fn fill_rect(img: &mut RgbaImage, rect: Rect, color: [u8; 4]) {
    let bounds = Rect::of_image(img);
    for y in rect.top.max(bounds.top)..rect.bottom.min(bounds.bottom) {
        for x in rect.left.max(bounds.left)..rect.right.min(bounds.right) {
            if color[3] == 255 {
                img.put_pixel(x as u32, y as u32, Rgba(color));
            } else {
                blend(img, x, y, color, 1.0);
            }
        }
    }
}

/// Fill column `x` between two rows (either order), clipped to `clip`.
pub fn fill_span(img: &mut RgbaImage, x: i32, y0: i32, y1: i32, color: [u8; 4], clip: Rect) {
    if x < clip.left || x >= clip.right {
        return;
    }
    let (top, bottom) = if y0 <= y1 { (y0, y1) } else { (y1, y0) };
    for y in top.max(clip.top)..=bottom.min(clip.bottom - 1) {
        blend(img, x, y, color, 1.0);
    }
}

/// Opaque line of the given width, stamped along its length and clipped to `clip`.
pub fn draw_line(
    img: &mut RgbaImage,
    from: (f32, f32),
    to: (f32, f32),
    width: f32,
    color: [u8; 3],
    clip: Rect,
) {
    let (dx, dy) = (to.0 - from.0, to.1 - from.1);
    let steps = (dx.abs().max(dy.abs()) * 2.0).ceil().max(1.0) as usize;
    let half = (width / 2.0).max(0.5);
    let reach = half.ceil() as i32;
    let pixel = Rgba([color[0], color[1], color[2], 255]);

    for step in 0..=steps {
        let t = step as f32 / steps as f32;
        let cx = from.0 + dx * t;
        let cy = from.1 + dy * t;
        let (ix, iy) = (cx.floor() as i32, cy.floor() as i32);
        for oy in -reach..=reach {
            for ox in -reach..=reach {
                let (x, y) = (ix + ox, iy + oy);
                let ddx = x as f32 + 0.5 - cx;
                let ddy = y as f32 + 0.5 - cy;
                if ddx.abs() > half || ddy.abs() > half || !clip.contains(x, y) {
                    continue;
                }
                if x >= 0 && y >= 0 && (x as u32) < img.width() && (y as u32) < img.height() {
                    img.put_pixel(x as u32, y as u32, pixel);
                }
            }
        }
    }
}
