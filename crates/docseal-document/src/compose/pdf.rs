// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF compositor: stamps the verification QR and caption onto the top-right
// corner of the first page using `lopdf`.
//
// The existing page content is bracketed by `q`/`Q` so none of its graphics
// state reaches the overlay. Other pages are left untouched.

use docseal_core::DocumentId;
use docseal_core::error::{DocsealError, Result};
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, dictionary};
use tracing::{debug, info, instrument, warn};

use crate::qr::render::{QrRenderer, RenderedQr};

/// Gap between the QR and the page's top and right edges, in points.
pub const PAGE_PADDING: f32 = 15.0;
/// How far the white backing square extends past the QR on each side.
pub const BACKING_MARGIN: f32 = 5.0;
const BACKING_OPACITY: f32 = 0.9;

/// A stamped PDF.
#[derive(Debug, Clone)]
pub struct ComposedPdf {
    pub pdf: Vec<u8>,
    /// QR side in points, after fitting to whole modules.
    pub qr_size: u32,
}

/// Stamps PDF documents.
#[derive(Debug, Clone)]
pub struct PdfCompositor {
    renderer: QrRenderer,
    /// Requested display size of the QR in points.
    qr_size: u32,
}

impl PdfCompositor {
    pub fn new(renderer: QrRenderer, qr_size: u32) -> Self {
        Self { renderer, qr_size }
    }

    /// Add the QR symbol for `payload` and the `id` caption to page one.
    #[instrument(skip(self, data, payload), fields(data_len = data.len(), id = %id))]
    pub fn stamp(&self, data: &[u8], payload: &str, id: &DocumentId) -> Result<ComposedPdf> {
        if data.is_empty() {
            return Err(DocsealError::EmptyInput("PDF has no bytes".into()));
        }
        let mut doc = Document::load_mem(data)
            .map_err(|err| DocsealError::PdfDecode(format!("failed to load PDF: {err}")))?;

        let first_page = doc
            .get_pages()
            .into_iter()
            .next()
            .map(|(_, page_id)| page_id)
            .ok_or_else(|| DocsealError::PdfDecode("document has no pages".into()))?;

        let (llx, lly, urx, ury) = media_box(&doc, first_page)?;
        let qr = self.renderer.render(payload, self.qr_size)?;
        let size = qr.display_size as f32;
        let x = urx - size - PAGE_PADDING;
        let y = ury - size - PAGE_PADDING;
        info!(
            page_width = urx - llx,
            page_height = ury - lly,
            x,
            y,
            "Stamping first page"
        );

        let names = ResourceNames::pick(&doc, first_page)?;
        let image_id = doc.add_object(qr_image_stream(&qr));
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let gs_id = doc.add_object(dictionary! {
            "Type" => "ExtGState",
            "ca" => Object::Real(BACKING_OPACITY.into()),
        });
        install_resources(&mut doc, first_page, &names, image_id, font_id, gs_id)?;

        let overlay = overlay_content(&names, id, x, y, size)
            .encode()
            .map_err(|err| DocsealError::PdfEncode(format!("overlay content: {err}")))?;
        wrap_contents(&mut doc, first_page, overlay)?;

        let mut output = Vec::new();
        doc.save_to(&mut output)
            .map_err(|err| DocsealError::PdfEncode(format!("failed to serialise PDF: {err}")))?;
        debug!(output_bytes = output.len(), "PDF stamped");
        Ok(ComposedPdf {
            pdf: output,
            qr_size: qr.display_size,
        })
    }
}

/// Names the overlay's resources will be registered under, chosen so they do
/// not collide with anything the page already uses.
#[derive(Debug)]
struct ResourceNames {
    image: String,
    font: String,
    state: String,
}

impl ResourceNames {
    fn pick(doc: &Document, page_id: ObjectId) -> Result<Self> {
        let resources = page_resources(doc, page_id)?;
        Ok(Self {
            image: free_name(doc, &resources, b"XObject", "DsQr"),
            font: free_name(doc, &resources, b"Font", "DsFont"),
            state: free_name(doc, &resources, b"ExtGState", "DsGs"),
        })
    }
}

fn free_name(doc: &Document, resources: &Dictionary, category: &[u8], base: &str) -> String {
    let taken = resources
        .get(category)
        .ok()
        .and_then(|obj| resolve_dict(doc, obj))
        .unwrap_or_default();
    let mut candidate = base.to_string();
    let mut n = 1;
    while taken.has(candidate.as_bytes()) {
        candidate = format!("{base}{n}");
        n += 1;
    }
    candidate
}

/// Follow a reference (if any) to a dictionary and clone it.
fn resolve_dict(doc: &Document, obj: &Object) -> Option<Dictionary> {
    match obj {
        Object::Dictionary(dict) => Some(dict.clone()),
        Object::Reference(id) => doc.get_dictionary(*id).ok().cloned(),
        _ => None,
    }
}

/// Look up a page attribute, walking `/Parent` for inheritable keys.
fn inherited<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut current = doc.get_dictionary(page_id).ok()?;
    // Bounded walk in case of a cyclic page tree.
    for _ in 0..32 {
        if let Ok(value) = current.get(key) {
            return Some(value);
        }
        let parent = current.get(b"Parent").ok()?.as_reference().ok()?;
        current = doc.get_dictionary(parent).ok()?;
    }
    None
}

/// The page's effective resource dictionary (inherited or inline), cloned.
fn page_resources(doc: &Document, page_id: ObjectId) -> Result<Dictionary> {
    match inherited(doc, page_id, b"Resources") {
        None => Ok(Dictionary::new()),
        Some(obj) => resolve_dict(doc, obj)
            .ok_or_else(|| DocsealError::PdfDecode("page /Resources is not a dictionary".into())),
    }
}

/// `[llx, lly, urx, ury]` of the page, defaulting to US Letter.
fn media_box(doc: &Document, page_id: ObjectId) -> Result<(f32, f32, f32, f32)> {
    let Some(obj) = inherited(doc, page_id, b"MediaBox") else {
        warn!("page has no /MediaBox, assuming US Letter");
        return Ok((0.0, 0.0, 612.0, 792.0));
    };
    let array = match obj {
        Object::Reference(id) => doc.get_object(*id).and_then(Object::as_array),
        other => other.as_array(),
    }
    .map_err(|err| DocsealError::PdfDecode(format!("bad /MediaBox: {err}")))?;
    if array.len() != 4 {
        return Err(DocsealError::PdfDecode(format!(
            "/MediaBox has {} entries",
            array.len()
        )));
    }
    let mut v = [0f32; 4];
    for (slot, item) in v.iter_mut().zip(array) {
        let n: f64 = item
            .as_float()
            .map_err(|err| DocsealError::PdfDecode(format!("bad /MediaBox entry: {err}")))?
            .into();
        *slot = n as f32;
    }
    Ok((v[0].min(v[2]), v[1].min(v[3]), v[0].max(v[2]), v[1].max(v[3])))
}

/// The supersampled QR as an 8-bit DeviceRGB image XObject.
fn qr_image_stream(qr: &RenderedQr) -> Stream {
    let rgb: Vec<u8> = qr
        .image
        .pixels()
        .flat_map(|p| [p.0[0], p.0[1], p.0[2]])
        .collect();
    let mut stream = Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => qr.image.width() as i64,
            "Height" => qr.image.height() as i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8i64,
        },
        rgb,
    );
    if let Err(err) = stream.compress() {
        warn!(%err, "QR image left uncompressed");
    }
    stream
}

/// Give the page an inline resource dictionary holding its old resources plus
/// the overlay's image, font, and graphics state.
fn install_resources(
    doc: &mut Document,
    page_id: ObjectId,
    names: &ResourceNames,
    image_id: ObjectId,
    font_id: ObjectId,
    gs_id: ObjectId,
) -> Result<()> {
    let mut resources = page_resources(doc, page_id)?;
    for (category, name, id) in [
        (&b"XObject"[..], &names.image, image_id),
        (&b"Font"[..], &names.font, font_id),
        (&b"ExtGState"[..], &names.state, gs_id),
    ] {
        let mut sub = resources
            .get(category)
            .ok()
            .and_then(|obj| resolve_dict(doc, obj))
            .unwrap_or_default();
        sub.set(name.as_bytes().to_vec(), Object::Reference(id));
        resources.set(category.to_vec(), Object::Dictionary(sub));
    }
    doc.get_dictionary_mut(page_id)
        .map_err(|err| DocsealError::PdfDecode(format!("page dictionary: {err}")))?
        .set("Resources", Object::Dictionary(resources));
    Ok(())
}

/// Replace `/Contents` with `q`, the old streams, `Q`, then the overlay.
fn wrap_contents(doc: &mut Document, page_id: ObjectId, overlay: Vec<u8>) -> Result<()> {
    let existing: Vec<Object> = match doc
        .get_dictionary(page_id)
        .map_err(|err| DocsealError::PdfDecode(format!("page dictionary: {err}")))?
        .get(b"Contents")
    {
        Ok(Object::Reference(id)) => vec![Object::Reference(*id)],
        Ok(Object::Array(items)) => items.clone(),
        Ok(other) => {
            return Err(DocsealError::PdfDecode(format!(
                "unexpected /Contents object: {other:?}"
            )));
        }
        Err(_) => Vec::new(),
    };

    let save_id = doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
    let restore_id = doc.add_object(Stream::new(Dictionary::new(), b"\nQ\n".to_vec()));
    let overlay_id = doc.add_object(Stream::new(Dictionary::new(), overlay));

    let mut contents = Vec::with_capacity(existing.len() + 3);
    contents.push(Object::Reference(save_id));
    contents.extend(existing);
    contents.push(Object::Reference(restore_id));
    contents.push(Object::Reference(overlay_id));

    doc.get_dictionary_mut(page_id)
        .map_err(|err| DocsealError::PdfDecode(format!("page dictionary: {err}")))?
        .set("Contents", Object::Array(contents));
    Ok(())
}

fn real(v: f32) -> Object {
    Object::Real(v.into())
}

fn name(n: &str) -> Object {
    Object::Name(n.as_bytes().to_vec())
}

fn op(operator: &str, operands: Vec<Object>) -> Operation {
    Operation::new(operator, operands)
}

/// Backing square, QR image, and two caption lines. (`x`, `y`) is the QR's
/// lower-left corner in user space.
fn overlay_content(names: &ResourceNames, id: &DocumentId, x: f32, y: f32, size: f32) -> Content {
    let pad = BACKING_MARGIN;
    let mut ops = vec![
        // Backing square: white fill at reduced opacity, 1pt grey border.
        op("q", vec![]),
        op("gs", vec![name(&names.state)]),
        op("rg", vec![real(1.0), real(1.0), real(1.0)]),
        op("RG", vec![real(0.8), real(0.8), real(0.8)]),
        op("w", vec![real(1.0)]),
        op(
            "re",
            vec![real(x - pad), real(y - pad), real(size + 2.0 * pad), real(size + 2.0 * pad)],
        ),
        op("B", vec![]),
        op("Q", vec![]),
        // QR image scaled to its display size.
        op("q", vec![]),
        op(
            "cm",
            vec![real(size), real(0.0), real(0.0), real(size), real(x), real(y)],
        ),
        op("Do", vec![name(&names.image)]),
        op("Q", vec![]),
    ];
    ops.extend(caption(&names.font, &format!("Doc ID: {id}"), 8.0, 0.2, x, y - 18.0));
    ops.extend(caption(&names.font, "Scan to verify", 6.0, 0.4, x, y - 30.0));
    Content { operations: ops }
}

fn caption(font: &str, text: &str, size: f32, grey: f32, x: f32, y: f32) -> Vec<Operation> {
    vec![
        op("BT", vec![]),
        op("Tf", vec![name(font), real(size)]),
        op("rg", vec![real(grey), real(grey), real(grey)]),
        op("Td", vec![real(x), real(y)]),
        op("Tj", vec![Object::string_literal(text)]),
        op("ET", vec![]),
    ]
}

/// Build a blank document with `pages` pages of `width × height` points.
#[cfg(any(test, feature = "fixtures"))]
pub fn blank_pdf(pages: usize, width: f32, height: f32) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let mut kids = Vec::new();
    for n in 0..pages {
        let body = format!("BT /F1 12 Tf 72 72 Td (page {}) Tj ET", n + 1);
        let content_id = doc.add_object(Stream::new(Dictionary::new(), body.into_bytes()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(Object::Reference(page_id));
    }
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Count" => pages as i64,
            "Kids" => kids,
            "MediaBox" => vec![Object::Integer(0), Object::Integer(0), real(width), real(height)],
            "Resources" => dictionary! { "Font" => dictionary! { "F1" => font_id } },
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    let mut out = Vec::new();
    doc.save_to(&mut out).expect("in-memory save");
    out
}
