// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Compositing: routes an uploaded file to the PDF or raster compositor.

pub mod image;
pub mod pdf;

use docseal_core::config::QrSettings;
use docseal_core::error::{DocsealError, Result};
use docseal_core::{DocumentId, MediaType, UploadedFile};
use tracing::instrument;

use crate::placement::Placement;
use crate::qr::render::QrRenderer;

use self::image::ImageCompositor;
use self::pdf::PdfCompositor;

/// A stamped document, ready to hand back to the caller.
#[derive(Debug, Clone)]
pub struct ComposedDocument {
    pub bytes: Vec<u8>,
    /// PDF for PDF input, PNG for every raster input.
    pub media_type: MediaType,
    /// Displayed QR side (points for PDF, pixels for images).
    pub qr_size: u32,
    /// Chosen corner; `None` for PDFs, which always use the top-right.
    pub placement: Option<Placement>,
}

impl ComposedDocument {
    /// File extension matching the output encoding.
    pub fn extension(&self) -> &'static str {
        match self.media_type {
            MediaType::Pdf => "pdf",
            _ => "png",
        }
    }
}

/// Stamp `file` with the QR for `payload` and an `id` caption.
#[instrument(skip(file, payload, settings), fields(name = %file.name, media = ?file.media_type))]
pub fn compose(
    file: &UploadedFile,
    payload: &str,
    id: &DocumentId,
    settings: &QrSettings,
) -> Result<ComposedDocument> {
    if file.bytes.is_empty() {
        return Err(DocsealError::EmptyInput(format!("{} has no bytes", file.name)));
    }
    let renderer = QrRenderer::from_settings(settings)?;
    match file.media_type {
        MediaType::Pdf => {
            let stamped = PdfCompositor::new(renderer, settings.pdf_size).stamp(&file.bytes, payload, id)?;
            Ok(ComposedDocument {
                bytes: stamped.pdf,
                media_type: MediaType::Pdf,
                qr_size: stamped.qr_size,
                placement: None,
            })
        }
        _ => {
            let stamped = ImageCompositor::new(renderer).stamp(&file.bytes, payload, id)?;
            Ok(ComposedDocument {
                bytes: stamped.png,
                media_type: MediaType::Png,
                qr_size: stamped.qr_size,
                placement: Some(stamped.placement),
            })
        }
    }
}
