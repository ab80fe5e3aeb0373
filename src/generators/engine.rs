//! PDF rendering engine.
//!
//! A [`PdfDocument`] owns a list of page [`Canvas`]es and the images they
//! reference; [`PdfDocument::finish`] serializes everything with
//! `pdf-writer`. Object numbering depends only on what was drawn, so identical
//! drawing calls produce identical bytes.

use std::path::Path;

use pdf_writer::{Content, Filter, Name, Pdf, Rect, Ref, Str};

use super::fonts::{to_winansi_bytes, wrap_text, Font};

const DEFLATE_LEVEL: u8 = 6;

/// Approximate cap height of Helvetica, as a fraction of the font size.
pub const CAP_HEIGHT: f32 = 0.718;

/// Decoded raster image ready to be embedded.
#[derive(Debug, Clone)]
pub struct LoadedImage {
    width: u32,
    height: u32,
    rgb: Vec<u8>,
    alpha: Option<Vec<u8>>,
}

impl LoadedImage {
    /// Decode the image at `path`.
    ///
    /// Returns `None` when there is no path, the file does not exist or it
    /// cannot be decoded; documents are then drawn without it.
    pub fn load(path: Option<&Path>) -> Option<Self> {
        let path = path?;
        if !path.exists() {
            log::debug!("Logo not found at {}, rendering without it", path.display());
            return None;
        }

        let decoded = match image::open(path) {
            Ok(img) => img,
            Err(e) => {
                log::warn!("Failed to decode logo {}: {}", path.display(), e);
                return None;
            }
        };

        let rgba = decoded.to_rgba8();
        let has_alpha = rgba.pixels().any(|p| p.0[3] < 255);
        let rgb = rgba.pixels().flat_map(|p| [p.0[0], p.0[1], p.0[2]]).collect();
        let alpha = has_alpha.then(|| rgba.pixels().map(|p| p.0[3]).collect());

        Some(Self {
            width: rgba.width(),
            height: rgba.height(),
            rgb,
            alpha,
        })
    }
}

/// Handle to an image registered with a [`PdfDocument`].
#[derive(Debug, Clone)]
pub struct ImageHandle {
    name: String,
    width: u32,
    height: u32,
}

impl ImageHandle {
    /// Largest (width, height) with the image's aspect ratio fitting the box.
    pub fn fit_within(&self, box_width: f32, box_height: f32) -> (f32, f32) {
        if self.width == 0 || self.height == 0 {
            return (box_width, box_height);
        }
        let scale = (box_width / self.width as f32).min(box_height / self.height as f32);
        (self.width as f32 * scale, self.height as f32 * scale)
    }
}

/// Horizontal anchoring of a single text line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
    Right,
}

/// Drawing surface for one page, in PDF points with a bottom-left origin.
pub struct Canvas {
    content: Content,
    width: f32,
    height: f32,
}

impl Canvas {
    fn new(width: f32, height: f32) -> Self {
        Self {
            content: Content::new(),
            width,
            height,
        }
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    /// Draw one line of text anchored at `x` according to `align`.
    pub fn text(&mut self, font: Font, size: f32, x: f32, y: f32, align: Align, text: &str) {
        if text.is_empty() {
            return;
        }
        let width = font.text_width(text, size);
        let start_x = match align {
            Align::Left => x,
            Align::Center => x - width / 2.0,
            Align::Right => x - width,
        };
        let bytes = to_winansi_bytes(text);
        self.content
            .begin_text()
            .set_font(font.resource_name(), size)
            .next_line(start_x, y)
            .show(Str(&bytes))
            .end_text();
    }

    /// Draw a line stretched to `width` by widening its inter-word spaces.
    pub fn text_justified(&mut self, font: Font, size: f32, x: f32, y: f32, width: f32, text: &str) {
        let spaces = text.matches(' ').count();
        let natural = font.text_width(text, size);
        if spaces == 0 || natural >= width {
            self.text(font, size, x, y, Align::Left, text);
            return;
        }

        let word_spacing = (width - natural) / spaces as f32;
        let bytes = to_winansi_bytes(text);
        self.content
            .begin_text()
            .set_font(font.resource_name(), size)
            .set_word_spacing(word_spacing)
            .next_line(x, y)
            .show(Str(&bytes))
            .set_word_spacing(0.0)
            .end_text();
    }

    /// Stroke a straight rule.
    pub fn line(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, line_width: f32) {
        self.content
            .set_line_width(line_width)
            .move_to(x1, y1)
            .line_to(x2, y2)
            .stroke();
    }

    /// Fill a rectangle with a gray level (0 = black, 1 = white).
    pub fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32, gray: f32) {
        self.content
            .save_state()
            .set_fill_gray(gray)
            .rect(x, y, width, height)
            .fill_nonzero()
            .restore_state();
    }

    /// Stroke the outline of a rectangle.
    pub fn stroke_rect(&mut self, x: f32, y: f32, width: f32, height: f32, line_width: f32) {
        self.content
            .set_line_width(line_width)
            .rect(x, y, width, height)
            .stroke();
    }

    /// Paint a registered image with its lower-left corner at (`x`, `y`).
    pub fn image(&mut self, handle: &ImageHandle, x: f32, y: f32, width: f32, height: f32) {
        self.content
            .save_state()
            .transform([width, 0.0, 0.0, height, x, y])
            .x_object(Name(handle.name.as_bytes()))
            .restore_state();
    }
}

/// A box that receives a wrapped paragraph.
#[derive(Debug, Clone, Copy)]
pub struct TextFrame {
    pub x: f32,
    /// Top edge, in points from the page bottom.
    pub top: f32,
    pub width: f32,
    pub height: f32,
    pub padding: f32,
}

impl Canvas {
    /// Wrap `text` into `frame` and draw it justified, the last line flush
    /// left. Lines that would cross the bottom of the frame are not drawn.
    /// Returns the number of lines drawn.
    pub fn paragraph_justified(
        &mut self,
        frame: TextFrame,
        font: Font,
        size: f32,
        leading: f32,
        text: &str,
    ) -> usize {
        let inner_width = frame.width - 2.0 * frame.padding;
        let bottom = frame.top - frame.height + frame.padding;
        let lines = wrap_text(font, size, text, inner_width);
        let x = frame.x + frame.padding;
        let mut baseline = frame.top - frame.padding - size;
        let mut drawn = 0;

        for (index, line) in lines.iter().enumerate() {
            if baseline < bottom {
                log::warn!(
                    "Paragraph truncated: {} of {} lines fit the frame",
                    drawn,
                    lines.len()
                );
                break;
            }
            if index + 1 == lines.len() {
                self.text(font, size, x, baseline, Align::Left, line);
            } else {
                self.text_justified(font, size, x, baseline, inner_width, line);
            }
            drawn += 1;
            baseline -= leading;
        }
        drawn
    }
}

/// Single-call owner of every page and image of one output document.
pub struct PdfDocument {
    page_width: f32,
    page_height: f32,
    pages: Vec<Canvas>,
    images: Vec<(String, LoadedImage)>,
}

impl PdfDocument {
    pub fn new(page_width: f32, page_height: f32) -> Self {
        Self {
            page_width,
            page_height,
            pages: Vec::new(),
            images: Vec::new(),
        }
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Start a new page and return its canvas.
    pub fn add_page(&mut self) -> &mut Canvas {
        self.pages.push(Canvas::new(self.page_width, self.page_height));
        self.current_page()
    }

    /// Canvas of the most recently added page, creating the first page if needed.
    pub fn current_page(&mut self) -> &mut Canvas {
        if self.pages.is_empty() {
            self.pages.push(Canvas::new(self.page_width, self.page_height));
        }
        let last = self.pages.len() - 1;
        &mut self.pages[last]
    }

    /// Register an image so pages can paint it.
    pub fn register_image(&mut self, image: LoadedImage) -> ImageHandle {
        let name = format!("Im{}", self.images.len() + 1);
        let handle = ImageHandle {
            name: name.clone(),
            width: image.width,
            height: image.height,
        };
        self.images.push((name, image));
        handle
    }

    /// Serialize the document.
    pub fn finish(self) -> Vec<u8> {
        let mut pdf = Pdf::new();
        let mut next_id = 1i32;
        let mut alloc = || {
            let r = Ref::new(next_id);
            next_id += 1;
            r
        };

        let catalog_id = alloc();
        let pages_id = alloc();

        let font_refs: Vec<(Font, Ref)> = Font::ALL.iter().map(|font| (*font, alloc())).collect();
        for (font, font_ref) in &font_refs {
            pdf.type1_font(*font_ref)
                .base_font(font.base_font())
                .encoding_predefined(Name(b"WinAnsiEncoding"));
        }

        let mut image_refs: Vec<(String, Ref)> = Vec::new();
        for (name, image) in &self.images {
            let smask_ref = image.alpha.as_ref().map(|alpha| {
                let mask_ref = alloc();
                let compressed = miniz_oxide::deflate::compress_to_vec_zlib(alpha, DEFLATE_LEVEL);
                let mut mask = pdf.image_xobject(mask_ref, &compressed);
                mask.filter(Filter::FlateDecode);
                mask.width(image.width as i32);
                mask.height(image.height as i32);
                mask.color_space().device_gray();
                mask.bits_per_component(8);
                mask_ref
            });

            let xobj_ref = alloc();
            let compressed = miniz_oxide::deflate::compress_to_vec_zlib(&image.rgb, DEFLATE_LEVEL);
            let mut xobj = pdf.image_xobject(xobj_ref, &compressed);
            xobj.filter(Filter::FlateDecode);
            xobj.width(image.width as i32);
            xobj.height(image.height as i32);
            xobj.color_space().device_rgb();
            xobj.bits_per_component(8);
            if let Some(mask_ref) = smask_ref {
                xobj.s_mask(mask_ref);
            }
            image_refs.push((name.clone(), xobj_ref));
        }

        let n = self.pages.len();
        let page_ids: Vec<Ref> = (0..n).map(|_| alloc()).collect();
        let content_ids: Vec<Ref> = (0..n).map(|_| alloc()).collect();

        for (i, canvas) in self.pages.into_iter().enumerate() {
            let raw = canvas.content.finish();
            let compressed = miniz_oxide::deflate::compress_to_vec_zlib(&raw, DEFLATE_LEVEL);
            pdf.stream(content_ids[i], &compressed).filter(Filter::FlateDecode);
        }

        pdf.catalog(catalog_id).pages(pages_id);
        pdf.pages(pages_id)
            .kids(page_ids.iter().copied())
            .count(n as i32);

        for i in 0..n {
            let mut page = pdf.page(page_ids[i]);
            page.media_box(Rect::new(0.0, 0.0, self.page_width, self.page_height))
                .parent(pages_id)
                .contents(content_ids[i]);
            let mut resources = page.resources();
            {
                let mut fonts = resources.fonts();
                for (font, font_ref) in &font_refs {
                    fonts.pair(font.resource_name(), *font_ref);
                }
            }
            if !image_refs.is_empty() {
                let mut xobjects = resources.x_objects();
                for (name, xobj_ref) in &image_refs {
                    xobjects.pair(Name(name.as_bytes()), *xobj_ref);
                }
            }
        }

        pdf.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_has_no_pages() {
        let doc = PdfDocument::new(100.0, 100.0);
        assert_eq!(doc.page_count(), 0);
        let bytes = doc.finish();
        assert!(bytes.starts_with(b"%PDF-"));
    }

    #[test]
    fn test_same_drawing_same_bytes() {
        let draw = || {
            let mut doc = PdfDocument::new(200.0, 200.0);
            let page = doc.add_page();
            page.text(Font::Helvetica, 12.0, 10.0, 100.0, Align::Left, "Olá");
            page.line(0.0, 50.0, 200.0, 50.0, 1.0);
            doc.finish()
        };
        assert_eq!(draw(), draw());
    }

    #[test]
    fn test_paragraph_is_clipped_to_frame() {
        let mut doc = PdfDocument::new(300.0, 300.0);
        let page = doc.add_page();
        let frame = TextFrame {
            x: 0.0,
            top: 200.0,
            width: 120.0,
            height: 40.0,
            padding: 6.0,
        };
        let text = "palavra ".repeat(60);
        let drawn = page.paragraph_justified(frame, Font::Helvetica, 12.0, 16.0, &text);
        assert_eq!(drawn, 2);
    }

    #[test]
    fn test_missing_logo_is_none() {
        assert!(LoadedImage::load(None).is_none());
        assert!(LoadedImage::load(Some(Path::new("/nonexistent/logo.png"))).is_none());
    }
}
