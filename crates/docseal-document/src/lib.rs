// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// docseal-document: the verification QR and everything that puts it on a page.
//
// Provides payload building and parsing, QR rendering with supersampling and
// sharpening, corner placement scoring for raster canvases, and compositors
// that stamp the QR plus a caption onto a PDF first page or a raster image.

mod glyphs;

pub mod compose;
pub mod placement;
pub mod qr;

pub use compose::{ComposedDocument, compose};
pub use compose::image::ImageCompositor;
pub use compose::pdf::{ComposedPdf, PdfCompositor};
pub use placement::{Placement, Region, find_optimal_position};
pub use qr::payload::{VerificationLink, build_payload, parse_payload};
pub use qr::render::{QrRenderer, RenderedQr};
pub use qr::scan::decode_qr;
