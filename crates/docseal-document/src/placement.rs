// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Placement scorer: chooses the canvas corner where a QR symbol is least
// likely to cover content.
//
// Each corner is sampled on a 5-pixel grid. Light pixels count in favour,
// high-contrast pixels against:
//
//     score = 0.7 × whitespace_ratio − 0.3 × edge_ratio

use std::fmt;

use image::{Rgba, RgbaImage};
use serde::Serialize;
use tracing::{debug, instrument};

/// Distance between sampled pixels, in both axes.
pub const SAMPLE_STEP: usize = 5;
/// Keep-out distance from the canvas edge for the chosen position.
pub const EDGE_PADDING: i64 = 10;
/// Mean RGB above which a sample counts as whitespace.
pub const WHITESPACE_THRESHOLD: f64 = 200.0;
/// Mean RGB difference to the up-left neighbour that counts as an edge.
pub const EDGE_THRESHOLD: f64 = 50.0;

/// A candidate corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Region {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Region {
    /// Visiting order. Ties keep the earlier region.
    pub const ALL: [Region; 4] = [
        Self::TopLeft,
        Self::TopRight,
        Self::BottomLeft,
        Self::BottomRight,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::TopLeft => "top-left",
            Self::TopRight => "top-right",
            Self::BottomLeft => "bottom-left",
            Self::BottomRight => "bottom-right",
        }
    }

    /// Unclamped origin of a `qr × qr` square in this corner. May be negative
    /// on canvases smaller than the symbol.
    fn origin(&self, width: i64, height: i64, qr: i64) -> (i64, i64) {
        match self {
            Self::TopLeft => (0, 0),
            Self::TopRight => (width - qr, 0),
            Self::BottomLeft => (0, height - qr),
            Self::BottomRight => (width - qr, height - qr),
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Where the QR goes, and why.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Placement {
    pub x: u32,
    pub y: u32,
    /// Winning score, or −1 if no region had any samples.
    pub score: f64,
    pub region: Region,
}

/// Score the four corners of `canvas` for a `qr_size` square and return the
/// best, clamped `EDGE_PADDING` away from the canvas edge.
#[instrument(skip(canvas), fields(width = canvas.width(), height = canvas.height()))]
pub fn find_optimal_position(canvas: &RgbaImage, qr_size: u32) -> Placement {
    let (width, height) = (canvas.width() as i64, canvas.height() as i64);
    let qr = qr_size as i64;

    let mut best_region = Region::TopRight;
    let mut best_score = -1.0_f64;

    for region in Region::ALL {
        let (rx, ry) = region.origin(width, height, qr);
        let Some(score) = score_region(canvas, rx, ry, qr) else {
            continue;
        };
        debug!(region = region.label(), score, "corner scored");
        if score > best_score {
            best_score = score;
            best_region = region;
        }
    }

    let (bx, by) = best_region.origin(width, height, qr);
    let placement = Placement {
        x: clamp_axis(bx, width, qr) as u32,
        y: clamp_axis(by, height, qr) as u32,
        score: best_score,
        region: best_region,
    };
    debug!(x = placement.x, y = placement.y, region = %placement.region, "placement chosen");
    placement
}

/// `max(padding, min(dim − qr − padding, v))`; the lower bound wins when the
/// canvas is too small for both.
fn clamp_axis(v: i64, dim: i64, qr: i64) -> i64 {
    EDGE_PADDING.max((dim - qr - EDGE_PADDING).min(v))
}

/// Score one region, or `None` if it contains no sample points.
fn score_region(canvas: &RgbaImage, rx: i64, ry: i64, qr: i64) -> Option<f64> {
    let (width, height) = (canvas.width() as i64, canvas.height() as i64);
    let (x0, x1) = (rx.max(0), width.min(rx + qr));
    let (y0, y1) = (ry.max(0), height.min(ry + qr));
    if x0 >= x1 || y0 >= y1 {
        return None;
    }

    let mut total = 0u32;
    let mut white = 0u32;
    let mut edges = 0u32;
    for y in (y0..y1).step_by(SAMPLE_STEP) {
        for x in (x0..x1).step_by(SAMPLE_STEP) {
            let brightness = mean_rgb(canvas.get_pixel(x as u32, y as u32));
            if brightness > WHITESPACE_THRESHOLD {
                white += 1;
            }
            if x > 0 && y > 0 {
                let neighbour = mean_rgb(canvas.get_pixel(x as u32 - 1, y as u32 - 1));
                if (brightness - neighbour).abs() > EDGE_THRESHOLD {
                    edges += 1;
                }
            }
            total += 1;
        }
    }

    let total = f64::from(total);
    Some(f64::from(white) / total * 0.7 - f64::from(edges) / total * 0.3)
}

fn mean_rgb(p: &Rgba<u8>) -> f64 {
    (f64::from(p.0[0]) + f64::from(p.0[1]) + f64::from(p.0[2])) / 3.0
}

#[cfg(test)]
mod tests {
    use super::*;

    const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
    const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);

    fn fill(canvas: &mut RgbaImage, x0: u32, y0: u32, w: u32, h: u32, colour: Rgba<u8>) {
        for y in y0..y0 + h {
            for x in x0..x0 + w {
                canvas.put_pixel(x, y, colour);
            }
        }
    }

    #[test]
    fn blank_canvas_prefers_first_region_on_ties() {
        let canvas = RgbaImage::from_pixel(400, 300, WHITE);
        let p = find_optimal_position(&canvas, 60);
        assert_eq!(p.region, Region::TopLeft);
        assert!((p.score - 0.7).abs() < 1e-9);
        assert_eq!((p.x, p.y), (10, 10));
    }

    #[test]
    fn dark_top_corners_push_symbol_down() {
        let mut canvas = RgbaImage::from_pixel(400, 300, WHITE);
        fill(&mut canvas, 0, 0, 400, 80, BLACK);
        let p = find_optimal_position(&canvas, 60);
        assert_eq!(p.region, Region::BottomLeft);
        assert_eq!((p.x, p.y), (10, 230));
    }

    #[test]
    fn bottom_right_is_clamped_inside_padding() {
        let mut canvas = RgbaImage::from_pixel(500, 400, BLACK);
        fill(&mut canvas, 430, 330, 70, 70, WHITE);
        let p = find_optimal_position(&canvas, 60);
        assert_eq!(p.region, Region::BottomRight);
        assert_eq!((p.x, p.y), (430, 330));
    }

    #[test]
    fn striped_corner_loses_to_blank_corner() {
        // One-pixel vertical rules: half the samples light, most of them edges.
        let mut canvas = RgbaImage::from_pixel(300, 300, WHITE);
        for x in (1..60).step_by(2) {
            fill(&mut canvas, x, 0, 1, 60, BLACK);
        }
        let p = find_optimal_position(&canvas, 60);
        assert_eq!(p.region, Region::TopRight);
        assert!((p.score - 0.7).abs() < 1e-9);
    }

    #[test]
    fn canvas_smaller_than_symbol_clamps_to_padding() {
        let canvas = RgbaImage::from_pixel(40, 30, WHITE);
        let p = find_optimal_position(&canvas, 60);
        assert_eq!((p.x, p.y), (10, 10));
    }

    #[test]
    fn empty_canvas_keeps_default_region() {
        let canvas = RgbaImage::new(0, 0);
        let p = find_optimal_position(&canvas, 60);
        assert_eq!(p.region, Region::TopRight);
        assert_eq!(p.score, -1.0);
    }
}
