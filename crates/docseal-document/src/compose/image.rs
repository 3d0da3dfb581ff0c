// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Raster compositor: places the QR in the emptiest corner of an image, on a
// translucent backing card with the document id underneath. Output is PNG at
// the input's full resolution.

use std::io::Cursor;

use docseal_core::DocumentId;
use docseal_core::error::{DocsealError, Result};
use image::imageops;
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use imageproc::drawing::{Blend, draw_filled_rect_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect;
use tracing::{debug, info, instrument};

use crate::glyphs;
use crate::placement::{Placement, find_optimal_position};
use crate::qr::render::{QrRenderer, RenderedQr};

/// QR side as a fraction of image width, before clamping.
pub const QR_WIDTH_FRACTION: f64 = 0.08;
pub const MIN_QR_SIZE: u32 = 60;
pub const MAX_QR_SIZE: u32 = 120;
/// Backing card padding around the QR.
pub const CARD_PADDING: i32 = 8;
/// Extra card height below the QR for the caption.
pub const CAPTION_SPACE: u32 = 25;
/// Caption baseline offset below the QR.
const CAPTION_BASELINE: i64 = 15;

const CARD_FILL: Rgba<u8> = Rgba([255, 255, 255, 242]);
const CARD_BORDER: Rgba<u8> = Rgba([200, 200, 200, 204]);
const CAPTION_INK: Rgba<u8> = Rgba([51, 51, 51, 255]);

/// A stamped raster image.
#[derive(Debug, Clone)]
pub struct ComposedImage {
    /// PNG bytes.
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub qr_size: u32,
    pub placement: Placement,
}

/// Stamps raster images.
#[derive(Debug, Clone, Default)]
pub struct ImageCompositor {
    renderer: QrRenderer,
}

impl ImageCompositor {
    pub fn new(renderer: QrRenderer) -> Self {
        Self { renderer }
    }

    /// Requested QR side: `clamp(width × 0.08, 60, 120)`, rounded down. The
    /// renderer may enlarge it for long payloads.
    pub fn qr_size_for(width: u32) -> u32 {
        ((width as f64 * QR_WIDTH_FRACTION) as u32).clamp(MIN_QR_SIZE, MAX_QR_SIZE)
    }

    /// Where [`ImageCompositor::stamp`] would put the QR for `payload` on
    /// `data`, and the side it would use.
    pub fn plan(&self, data: &[u8], payload: &str) -> Result<(Placement, u32)> {
        let canvas = decode(data)?;
        let qr_size = self
            .renderer
            .display_size_for(payload, Self::qr_size_for(canvas.width()))?;
        Ok((find_optimal_position(&canvas, qr_size), qr_size))
    }

    /// Decode `data`, stamp it, and re-encode as PNG.
    #[instrument(skip(self, data, payload), fields(data_len = data.len(), id = %id))]
    pub fn stamp(&self, data: &[u8], payload: &str, id: &DocumentId) -> Result<ComposedImage> {
        let canvas = decode(data)?;
        let (width, height) = canvas.dimensions();
        info!(width, height, "Stamping image");

        let qr = self.renderer.render(payload, Self::qr_size_for(width))?;
        let qr_size = qr.display_size;
        let placement = find_optimal_position(&canvas, qr_size);
        let stamped = stamp_canvas(canvas, &qr, id, &placement);

        let mut png = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(stamped)
            .write_to(&mut png, ImageFormat::Png)
            .map_err(|err| DocsealError::ImageEncode(format!("PNG encoding failed: {err}")))?;
        let png = png.into_inner();
        debug!(output_bytes = png.len(), region = %placement.region, "image stamped");

        Ok(ComposedImage {
            png,
            width,
            height,
            qr_size,
            placement,
        })
    }
}

fn stamp_canvas(canvas: RgbaImage, qr: &RenderedQr, id: &DocumentId, placement: &Placement) -> RgbaImage {
    let qr_size = qr.display_size;
    let (x, y) = (placement.x as i32, placement.y as i32);

    let card = Rect::at(x - CARD_PADDING, y - CARD_PADDING).of_size(
        qr_size + 2 * CARD_PADDING as u32,
        qr_size + 2 * CARD_PADDING as u32 + CAPTION_SPACE,
    );
    // A 2px stroke centred on the card edge.
    let outer = Rect::at(card.left() - 1, card.top() - 1)
        .of_size(card.width() + 2, card.height() + 2);

    let mut blend = Blend(canvas);
    draw_filled_rect_mut(&mut blend, card, CARD_FILL);
    draw_hollow_rect_mut(&mut blend, outer, CARD_BORDER);
    draw_hollow_rect_mut(&mut blend, card, CARD_BORDER);
    let mut canvas = blend.0;

    imageops::overlay(&mut canvas, &qr.at_display_size(), x as i64, y as i64);

    let caption = format!("ID: {id}");
    let caption_width = glyphs::text_width(&caption, 1) as i64;
    let caption_x = x as i64 + qr_size as i64 / 2 - caption_width / 2;
    let caption_top = y as i64 + qr_size as i64 + CAPTION_BASELINE - glyphs::GLYPH_HEIGHT as i64;
    glyphs::draw_text(&mut canvas, caption_x, caption_top, 1, CAPTION_INK, &caption);

    canvas
}

fn decode(data: &[u8]) -> Result<RgbaImage> {
    if data.is_empty() {
        return Err(DocsealError::EmptyInput("image has no bytes".into()));
    }
    let decoded = image::load_from_memory(data)
        .map_err(|err| DocsealError::ImageDecode(format!("failed to decode image: {err}")))?;
    Ok(decoded.to_rgba8())
}
