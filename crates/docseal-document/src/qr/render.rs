// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// QR renderer: every module covers a whole number of pixels, at least
// `MIN_MODULE_PX` of them at display size. The bitmap is drawn at twice that
// and sharpened so module edges survive printing and scaling.

use docseal_core::EcLevel;
use docseal_core::config::QrSettings;
use docseal_core::error::{DocsealError, Result};
use image::{Rgba, RgbaImage};
use qrcode::{Color, QrCode};
use tracing::{debug, info, instrument};

use super::payload::check_capacity;

/// 3×3 sharpen kernel, row-major.
const SHARPEN: [[i32; 3]; 3] = [[0, -1, 0], [-1, 5, -1], [0, -1, 0]];

/// Supersampling factor between the rendered and displayed symbol.
pub const SUPERSAMPLE: u32 = 2;

/// Fewest display pixels (or points) a single module may cover.
pub const MIN_MODULE_PX: u32 = 2;

/// A rendered, sharpened QR symbol.
#[derive(Debug, Clone)]
pub struct RenderedQr {
    /// Pixels at `SUPERSAMPLE ×` display size.
    pub image: RgbaImage,
    /// Side the symbol is drawn at on the target document. Always a whole
    /// multiple of `modules`, so it can differ from the size asked for.
    pub display_size: u32,
    /// Modules per side, quiet zone included.
    pub modules: u32,
}

impl RenderedQr {
    /// Side of the supersampled bitmap in pixels.
    pub fn side(&self) -> u32 {
        self.image.width()
    }

    /// Display pixels per module.
    pub fn module_size(&self) -> u32 {
        self.display_size / self.modules
    }

    /// The symbol at display size. Exact, since the supersampling factor is
    /// whole and every module is aligned to it.
    pub fn at_display_size(&self) -> RgbaImage {
        RgbaImage::from_fn(self.display_size, self.display_size, |x, y| {
            *self.image.get_pixel(x * SUPERSAMPLE, y * SUPERSAMPLE)
        })
    }
}

/// Renders verification payloads as QR symbols.
#[derive(Debug, Clone)]
pub struct QrRenderer {
    level: EcLevel,
    margin: u32,
    foreground: [u8; 3],
    background: [u8; 3],
}

impl Default for QrRenderer {
    fn default() -> Self {
        Self {
            level: EcLevel::H,
            margin: 4,
            foreground: [0, 0, 0],
            background: [255, 255, 255],
        }
    }
}

impl QrRenderer {
    pub fn from_settings(settings: &QrSettings) -> Result<Self> {
        Ok(Self {
            level: settings.error_correction,
            margin: settings.margin,
            foreground: settings.foreground_rgb()?,
            background: settings.background_rgb()?,
        })
    }

    pub fn level(&self) -> EcLevel {
        self.level
    }

    /// The side [`QrRenderer::render`] will use for `payload` when asked for
    /// `requested`.
    pub fn display_size_for(&self, payload: &str, requested: u32) -> Result<u32> {
        let (_, modules) = self.encode(payload, requested)?;
        Ok(fit_display(modules, requested))
    }

    /// Render `payload` for display at about `requested` pixels (or points).
    ///
    /// The side is snapped down to whole modules, and raised past
    /// `requested` when modules would otherwise be under `MIN_MODULE_PX`.
    #[instrument(skip(self, payload), fields(payload_len = payload.len(), level = %self.level))]
    pub fn render(&self, payload: &str, requested: u32) -> Result<RenderedQr> {
        let (code, modules) = self.encode(payload, requested)?;
        let display_size = fit_display(modules, requested);
        if display_size > requested {
            info!(requested, display_size, modules, "QR enlarged to keep modules scannable");
        }

        let width = code.width() as u32;
        let colours = code.to_colors();
        let module_px = display_size / modules * SUPERSAMPLE;
        let side = modules * module_px;
        let fg = Rgba([self.foreground[0], self.foreground[1], self.foreground[2], 255]);
        let bg = Rgba([self.background[0], self.background[1], self.background[2], 255]);

        let raw = RgbaImage::from_fn(side, side, |x, y| {
            let (mx, my) = (x / module_px, y / module_px);
            let inside = mx >= self.margin
                && my >= self.margin
                && mx < self.margin + width
                && my < self.margin + width;
            if !inside {
                return bg;
            }
            let index = ((my - self.margin) * width + (mx - self.margin)) as usize;
            match colours.get(index) {
                Some(Color::Dark) => fg,
                _ => bg,
            }
        });

        debug!(version_width = width, side, module_px, "QR rasterised");
        Ok(RenderedQr {
            image: sharpen(&raw),
            display_size,
            modules,
        })
    }

    fn encode(&self, payload: &str, requested: u32) -> Result<(QrCode, u32)> {
        if requested == 0 {
            return Err(DocsealError::InvalidInput("QR display size must be positive".into()));
        }
        check_capacity(payload, self.level)?;
        let code = QrCode::with_error_correction_level(payload.as_bytes(), qr_level(self.level))
            .map_err(|e| DocsealError::QrRender(format!("{e:?}")))?;
        let modules = code.width() as u32 + 2 * self.margin;
        Ok((code, modules))
    }
}

/// Largest whole-module side not above `requested`, but never under
/// `MIN_MODULE_PX` per module.
fn fit_display(modules: u32, requested: u32) -> u32 {
    (requested / modules).max(MIN_MODULE_PX) * modules
}

fn qr_level(level: EcLevel) -> qrcode::EcLevel {
    match level {
        EcLevel::L => qrcode::EcLevel::L,
        EcLevel::M => qrcode::EcLevel::M,
        EcLevel::Q => qrcode::EcLevel::Q,
        EcLevel::H => qrcode::EcLevel::H,
    }
}

/// Apply the sharpen kernel to interior pixels. Border pixels are copied
/// unchanged; every output pixel is opaque.
pub fn sharpen(source: &RgbaImage) -> RgbaImage {
    let (w, h) = source.dimensions();
    let mut out = source.clone();
    for pixel in out.pixels_mut() {
        pixel.0[3] = 255;
    }
    if w < 3 || h < 3 {
        return out;
    }
    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let mut acc = [0i32; 3];
            for (ky, row) in SHARPEN.iter().enumerate() {
                for (kx, &weight) in row.iter().enumerate() {
                    if weight == 0 {
                        continue;
                    }
                    let p = source.get_pixel(x + kx as u32 - 1, y + ky as u32 - 1);
                    for (c, sum) in acc.iter_mut().enumerate() {
                        *sum += p.0[c] as i32 * weight;
                    }
                }
            }
            out.put_pixel(
                x,
                y,
                Rgba([
                    acc[0].clamp(0, 255) as u8,
                    acc[1].clamp(0, 255) as u8,
                    acc[2].clamp(0, 255) as u8,
                    255,
                ]),
            );
        }
    }
    out
}
