// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Reading a QR symbol back out of a raster image.

use docseal_core::error::{DocsealError, Result};
use image::DynamicImage;
use tracing::{debug, instrument};

/// Decode the first readable QR symbol in encoded image bytes.
///
/// Returns `Ok(None)` when the image decodes but holds no readable symbol.
#[instrument(skip(data), fields(data_len = data.len()))]
pub fn decode_qr(data: &[u8]) -> Result<Option<String>> {
    if data.is_empty() {
        return Err(DocsealError::EmptyInput("image has no bytes".into()));
    }
    let img = image::load_from_memory(data)
        .map_err(|err| DocsealError::ImageDecode(format!("failed to decode image: {err}")))?;
    Ok(decode_qr_image(&img))
}

/// Decode the first readable QR symbol in an already-decoded image.
pub fn decode_qr_image(img: &DynamicImage) -> Option<String> {
    let luma = img.to_luma8();
    let mut prepared = rqrr::PreparedImage::prepare_from_greyscale(
        luma.width() as usize,
        luma.height() as usize,
        |x, y| luma.get_pixel(x as u32, y as u32).0[0],
    );
    let grids = prepared.detect_grids();
    debug!(candidates = grids.len(), "QR grids detected");
    grids
        .iter()
        .find_map(|grid| grid.decode().ok().map(|(_, content)| content))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qr::render::QrRenderer;
    use image::{ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;

    fn png(img: &RgbaImage) -> Vec<u8> {
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    const LINK: &str = "http://localhost:5173/verify?chain=amoy\
                        &contract=0x5fbdb2315678afecb367f032d93f642f64180aa3&id=ID_CARD-0badc0de";

    #[test]
    fn reads_back_a_rendered_symbol() {
        let qr = QrRenderer::default().render(LINK, 150).unwrap();
        assert_eq!(decode_qr(&png(&qr.image)).unwrap().as_deref(), Some(LINK));
    }

    #[test]
    fn reads_back_at_every_image_size() {
        for requested in [60, 80, 120] {
            let qr = QrRenderer::default().render(LINK, requested).unwrap();
            let shown = qr.at_display_size();
            assert_eq!(
                decode_qr(&png(&shown)).unwrap().as_deref(),
                Some(LINK),
                "requested {requested}, drawn at {}",
                qr.display_size
            );
        }
    }

    #[test]
    fn blank_image_has_no_symbol() {
        let blank = RgbaImage::from_pixel(64, 64, Rgba([255, 255, 255, 255]));
        assert_eq!(decode_qr(&png(&blank)).unwrap(), None);
    }

    #[test]
    fn garbage_is_a_decode_error() {
        assert!(matches!(
            decode_qr(b"definitely not an image"),
            Err(DocsealError::ImageDecode(_))
        ));
        assert!(matches!(decode_qr(&[]), Err(DocsealError::EmptyInput(_))));
    }
}
