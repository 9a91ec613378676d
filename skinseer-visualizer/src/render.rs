use image::{ImageBuffer, Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_filled_ellipse_mut, draw_filled_rect_mut};
use imageproc::rect::Rect;
use palette::{FromColor, Hsv, Srgb};
use skinseer_common::{ScanSnapshot, SimParams};

pub const BACKGROUND: [u8; 4] = [0, 0, 0, 255];
pub const EPIDERMIS: [u8; 4] = [238, 196, 160, 255];
pub const DERMIS: [u8; 4] = [205, 120, 110, 255];
pub const NEVUS: [u8; 4] = [70, 40, 30, 255];
pub const SOURCE: [u8; 4] = [255, 255, 255, 255];
pub const PHOTON: [u8; 4] = [255, 255, 120, 255];

// Height of a saturated detector bar as a fraction of the detector span.
const BAR_HEIGHT_ASPECT: f32 = 0.15;

/// Maps tissue coordinates (y up) onto pixel coordinates (y down).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width_px: u32,
    pub height_px: u32,
    pub pixels_per_unit: f32,
}

impl Viewport {
    /// Fits the scanner into `width_px`, rounding both dimensions down to
    /// even values as required by 4:2:0 video.
    pub fn fit(params: &SimParams, width_px: u32) -> Self {
        let width_px = (width_px.max(2)) & !1;
        let pixels_per_unit = width_px as f32 / params.scanner_width as f32;
        let height_px = ((params.scanner_height as f32 * pixels_per_unit) as u32).max(2) & !1;
        Viewport { width_px, height_px, pixels_per_unit }
    }

    pub fn to_pixel(&self, x: f32, y: f32) -> (i32, i32) {
        let px = (x * self.pixels_per_unit).round() as i32;
        let py = (self.height_px as f32 - y * self.pixels_per_unit).round() as i32;
        (px, py)
    }

    pub fn length(&self, units: f32) -> i32 {
        (units * self.pixels_per_unit).round() as i32
    }
}

/// A rendered video frame.
pub struct Frame {
    pub index: usize,
    pub image: RgbaImage,
}

/// Evenly spread hues, one per detector counter.
pub fn counter_palette(count: usize) -> Vec<[u8; 4]> {
    (0..count)
        .map(|i| {
            let hue = (i as f32) / (count.max(1) as f32) * 300.0;
            let rgb = Srgb::from_color(Hsv::new(hue, 0.75, 0.95));
            [
                (rgb.red * 255.0) as u8,
                (rgb.green * 255.0) as u8,
                (rgb.blue * 255.0) as u8,
                255,
            ]
        })
        .collect()
}

fn fill_rect(image: &mut RgbaImage, x0: i32, y0: i32, x1: i32, y1: i32, color: [u8; 4]) {
    let (left, right) = (x0.min(x1), x0.max(x1));
    let (top, bottom) = (y0.min(y1), y0.max(y1));
    let w = (right - left) as u32;
    let h = (bottom - top) as u32;
    if w == 0 || h == 0 {
        return;
    }
    draw_filled_rect_mut(image, Rect::at(left, top).of_size(w, h), Rgba(color));
}

/// Draws one snapshot: tissue bands, lesion, source, photon trace and
/// detector bars scaled against `max_count`.
pub fn draw_frame(
    snapshot: &ScanSnapshot,
    frame_index: usize,
    params: &SimParams,
    view: &Viewport,
    max_count: u32,
    bar_colors: &[[u8; 4]],
) -> Frame {
    let mut image = ImageBuffer::from_pixel(view.width_px, view.height_px, Rgba(BACKGROUND));
    let width = params.scanner_width as f32;

    // Tissue layers
    let (x0, surface) = view.to_pixel(0.0, params.epidermis_y());
    let (x1, boundary) = view.to_pixel(width, params.dermis_y());
    let (_, floor) = view.to_pixel(width, 0.0);
    fill_rect(&mut image, x0, surface, x1, boundary, EPIDERMIS);
    fill_rect(&mut image, x0, boundary, x1, floor, DERMIS);

    // Lesion
    if snapshot.lesion_valid && snapshot.lesion_width > 0.0 && snapshot.lesion_height > 0.0 {
        let center = view.to_pixel(
            snapshot.lesion_left + snapshot.lesion_width * 0.5,
            snapshot.lesion_bottom + snapshot.lesion_height * 0.5,
        );
        let rx = view.length(snapshot.lesion_width * 0.5).max(1);
        let ry = view.length(snapshot.lesion_height * 0.5).max(1);
        draw_filled_ellipse_mut(&mut image, center, rx, ry, Rgba(NEVUS));
    }

    // Source
    let c = params.source_center();
    draw_filled_circle_mut(
        &mut image,
        view.to_pixel(c.x, c.y),
        view.length(params.photon_source_radius).max(1),
        Rgba(SOURCE),
    );

    // Photon trace
    let photon_px = view.length(params.photon_radius).max(1);
    for &(x, y) in &snapshot.photon_trace {
        draw_filled_circle_mut(&mut image, view.to_pixel(x, y), photon_px, Rgba(PHOTON));
    }

    // Detector bars above the surface
    let span = params.photon_detector_width * snapshot.photon_counts.len() as f32;
    let full_bar = span * BAR_HEIGHT_ASPECT;
    for (i, &count) in snapshot.photon_counts.iter().enumerate() {
        let left = params.photon_detector_x + params.photon_detector_width * i as f32;
        let level = if max_count == 0 { 0.0 } else { count as f32 / max_count as f32 };
        let (bx0, by0) = view.to_pixel(left, params.epidermis_y());
        let (bx1, by1) = view.to_pixel(left + params.photon_detector_width, params.epidermis_y() + full_bar * level);
        let color = bar_colors.get(i % bar_colors.len().max(1)).copied().unwrap_or(SOURCE);
        fill_rect(&mut image, bx0 + 1, by0, bx1 - 1, by1, color);
    }

    Frame { index: frame_index, image }
}

/// RGB to YUV 4:2:0 conversion for video encoding (BT.601).
pub fn rgb_to_yuv420(image: &RgbaImage) -> Vec<u8> {
    let width = image.width() as usize;
    let height = image.height() as usize;
    let luma_size = width * height;
    let chroma_width = width / 2;
    let mut yuv = vec![0u8; luma_size + luma_size / 2];

    for (x, y, pixel) in image.enumerate_pixels() {
        let [r, g, b, _] = pixel.0.map(|c| c as f32);
        yuv[y as usize * width + x as usize] = (0.299 * r + 0.587 * g + 0.114 * b).round() as u8;
    }

    let u_offset = luma_size;
    let v_offset = luma_size + luma_size / 4;
    for cy in 0..height / 2 {
        for cx in 0..chroma_width {
            let mut sum_u = 0.0f32;
            let mut sum_v = 0.0f32;
            for (dx, dy) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
                let p = image.get_pixel((cx * 2 + dx) as u32, (cy * 2 + dy) as u32);
                let (r, g, b) = (p[0] as f32, p[1] as f32, p[2] as f32);
                sum_u += -0.169 * r - 0.331 * g + 0.5 * b + 128.0;
                sum_v += 0.5 * r - 0.419 * g - 0.081 * b + 128.0;
            }
            yuv[u_offset + cy * chroma_width + cx] = (sum_u / 4.0).round() as u8;
            yuv[v_offset + cy * chroma_width + cx] = (sum_v / 4.0).round() as u8;
        }
    }
    yuv
}
