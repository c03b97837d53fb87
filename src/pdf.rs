use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use anyhow::{anyhow, Context};
use printpdf::{
    BuiltinFont, Color, IndirectFontRef, Line, Mm, PdfDocument, PdfLayerReference, Point, Rgb,
};

use crate::card::{self, CardFace, Ink, CARD_HEIGHT_MM, CARD_WIDTH_MM};
use crate::model::Student;
use crate::qr;

pub const A4_WIDTH_MM: f64 = 210.0;
pub const A4_HEIGHT_MM: f64 = 297.0;

/// Outer page margin; also the horizontal gap between grid columns.
pub const PAGE_MARGIN_MM: f64 = 10.0;
pub const CARDS_PER_PAGE: usize = 4;
const GRID_COLS: usize = 2;

/// Quiet zone drawn around the QR symbol on card faces, in modules.
const QR_QUIET_MODULES: f64 = 1.0;

/// Placement of the i-th card in a batch run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub page: usize,
    pub row: usize,
    pub col: usize,
}

impl Slot {
    pub fn origin_mm(self) -> (f64, f64) {
        let x = PAGE_MARGIN_MM + self.col as f64 * (CARD_WIDTH_MM + PAGE_MARGIN_MM);
        // Rows get a doubled vertical gap so the cut lines stay clear.
        let y = PAGE_MARGIN_MM + self.row as f64 * (CARD_HEIGHT_MM + PAGE_MARGIN_MM * 2.0);
        (x, y)
    }
}

pub fn batch_slot(index: usize) -> Slot {
    let position = index % CARDS_PER_PAGE;
    Slot {
        page: index / CARDS_PER_PAGE,
        row: position / GRID_COLS,
        col: position % GRID_COLS,
    }
}

pub fn page_count(cards: usize) -> usize {
    (cards + CARDS_PER_PAGE - 1) / CARDS_PER_PAGE
}

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
}

/// Millimetres per typographic point, used to approximate centred text.
const MM_PER_PT: f64 = 0.352_778;
/// Rough mean glyph advance for Helvetica, as a fraction of the font size.
const GLYPH_ADVANCE_EM: f64 = 0.5;

fn ink_color(ink: Ink) -> Color {
    let (r, g, b) = ink.rgb();
    Color::Rgb(Rgb::new(r, g, b, None))
}

/// Axis-aligned filled rectangle. `y_top` is measured from the page top;
/// printpdf's origin is the bottom-left corner.
fn fill_rect(layer: &PdfLayerReference, x: f64, y_top: f64, w: f64, h: f64, page_h: f64, ink: Ink) {
    let y = page_h - y_top - h;
    let points = vec![
        (Point::new(Mm(x), Mm(y)), false),
        (Point::new(Mm(x + w), Mm(y)), false),
        (Point::new(Mm(x + w), Mm(y + h)), false),
        (Point::new(Mm(x), Mm(y + h)), false),
    ];
    layer.set_fill_color(ink_color(ink));
    layer.add_shape(Line {
        points,
        is_closed: true,
        has_fill: true,
        has_stroke: false,
        is_clipping_path: false,
    });
}

fn draw_text(
    layer: &PdfLayerReference,
    fonts: &Fonts,
    text: &str,
    x: f64,
    baseline_top: f64,
    size_pt: f64,
    bold: bool,
    ink: Ink,
    centered: bool,
    page_h: f64,
) {
    let font = if bold { &fonts.bold } else { &fonts.regular };
    let x = if centered {
        let width_mm = text.chars().count() as f64 * size_pt * GLYPH_ADVANCE_EM * MM_PER_PT;
        x - width_mm / 2.0
    } else {
        x
    };
    layer.set_fill_color(ink_color(ink));
    layer.use_text(text, size_pt, Mm(x), Mm(page_h - baseline_top), font);
}

/// Draws one card face with its top-left corner at `(origin_x, origin_y)`
/// (page-top coordinates). The QR symbol is drawn as vector modules from the
/// same matrix the raster preview uses.
fn draw_face(
    layer: &PdfLayerReference,
    fonts: &Fonts,
    face: &CardFace,
    origin_x: f64,
    origin_y: f64,
    page_h: f64,
) -> anyhow::Result<()> {
    fill_rect(
        layer,
        origin_x,
        origin_y,
        face.width,
        face.height,
        page_h,
        face.background,
    );
    for r in &face.rects {
        fill_rect(layer, origin_x + r.x, origin_y + r.y, r.w, r.h, page_h, r.ink);
    }

    if let Some(photo) = &face.photo {
        fill_rect(
            layer,
            origin_x + photo.x,
            origin_y + photo.y,
            photo.w,
            photo.h,
            page_h,
            Ink::PhotoGray,
        );
        if photo.photo_url.is_none() {
            draw_text(
                layer,
                fonts,
                &photo.initials,
                origin_x + photo.x + photo.w / 2.0,
                origin_y + photo.y + photo.h / 2.0 + 1.0,
                6.0,
                false,
                Ink::InitialsGray,
                true,
                page_h,
            );
        }
    }

    for t in &face.texts {
        draw_text(
            layer,
            fonts,
            &t.text,
            origin_x + t.x,
            origin_y + t.y,
            t.size_pt,
            t.bold,
            t.ink,
            t.centered,
            page_h,
        );
    }

    if let Some(slot) = &face.qr {
        let (size, cells) = qr::modules(&slot.payload)?;
        fill_rect(
            layer,
            origin_x + slot.x,
            origin_y + slot.y,
            slot.size,
            slot.size,
            page_h,
            Ink::White,
        );
        let module_mm = slot.size / (size as f64 + 2.0 * QR_QUIET_MODULES);
        for my in 0..size {
            for mx in 0..size {
                if cells[my * size + mx] {
                    fill_rect(
                        layer,
                        origin_x + slot.x + (mx as f64 + QR_QUIET_MODULES) * module_mm,
                        origin_y + slot.y + (my as f64 + QR_QUIET_MODULES) * module_mm,
                        module_mm,
                        module_mm,
                        page_h,
                        Ink::Heading,
                    );
                }
            }
        }
    }

    Ok(())
}

fn load_fonts(doc: &printpdf::PdfDocumentReference) -> anyhow::Result<Fonts> {
    let regular = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| anyhow!("load font: {:?}", e))?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| anyhow!("load font: {:?}", e))?;
    Ok(Fonts { regular, bold })
}

fn save_doc(doc: printpdf::PdfDocumentReference, path: &Path) -> anyhow::Result<()> {
    let file = File::create(path)
        .with_context(|| format!("create {}", path.display()))?;
    doc.save(&mut BufWriter::new(file))
        .map_err(|e| anyhow!("write pdf: {:?}", e))
}

/// One-page document sized exactly to the card, front face only.
pub fn single_card_pdf(student: &Student, institution: &str, path: &Path) -> anyhow::Result<()> {
    let (doc, page, layer) = PdfDocument::new(
        "Student ID Card",
        Mm(CARD_WIDTH_MM),
        Mm(CARD_HEIGHT_MM),
        "Card",
    );
    let fonts = load_fonts(&doc)?;
    let face = card::front_face(student, institution)?;
    let layer_ref = doc.get_page(page).get_layer(layer);
    draw_face(&layer_ref, &fonts, &face, 0.0, 0.0, CARD_HEIGHT_MM)?;
    save_doc(doc, path)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchSummary {
    pub cards: usize,
    pub pages: usize,
}

/// A4 portrait pages with four front faces in a 2x2 grid, in input order.
pub fn batch_pdf(
    students: &[Student],
    institution: &str,
    path: &Path,
) -> anyhow::Result<BatchSummary> {
    let (doc, first_page, first_layer) = PdfDocument::new(
        "Student ID Cards",
        Mm(A4_WIDTH_MM),
        Mm(A4_HEIGHT_MM),
        "Cards",
    );
    let fonts = load_fonts(&doc)?;

    let mut layer_ref = doc.get_page(first_page).get_layer(first_layer);
    for (i, student) in students.iter().enumerate() {
        if i > 0 && i % CARDS_PER_PAGE == 0 {
            let (page, layer) = doc.add_page(Mm(A4_WIDTH_MM), Mm(A4_HEIGHT_MM), "Cards");
            layer_ref = doc.get_page(page).get_layer(layer);
        }
        let (x, y) = batch_slot(i).origin_mm();
        let face = card::front_face(student, institution)?;
        draw_face(&layer_ref, &fonts, &face, x, y, A4_HEIGHT_MM)?;
    }

    save_doc(doc, path)?;
    Ok(BatchSummary {
        cards: students.len(),
        pages: page_count(students.len()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_count_rounds_up_by_four() {
        assert_eq!(page_count(0), 0);
        assert_eq!(page_count(1), 1);
        assert_eq!(page_count(4), 1);
        assert_eq!(page_count(5), 2);
        assert_eq!(page_count(8), 2);
        assert_eq!(page_count(9), 3);
    }

    #[test]
    fn slots_follow_page_row_col_order() {
        for i in 0..12 {
            let slot = batch_slot(i);
            assert_eq!(slot.page, i / 4);
            assert_eq!(slot.row, (i % 4) / 2);
            assert_eq!(slot.col, (i % 4) % 2);
        }
    }

    #[test]
    fn five_cards_span_two_pages_with_one_on_the_last() {
        let slots: Vec<Slot> = (0..5).map(batch_slot).collect();
        assert_eq!(slots.iter().filter(|s| s.page == 0).count(), 4);
        assert_eq!(slots.iter().filter(|s| s.page == 1).count(), 1);
        assert_eq!(slots[4], Slot { page: 1, row: 0, col: 0 });
    }

    #[test]
    fn grid_origins_stay_inside_an_a4_page() {
        for i in 0..4 {
            let (x, y) = batch_slot(i).origin_mm();
            assert!(x >= PAGE_MARGIN_MM);
            assert!(y >= PAGE_MARGIN_MM);
            assert!(x + CARD_WIDTH_MM <= A4_WIDTH_MM - PAGE_MARGIN_MM + 1e-9);
            assert!(y + CARD_HEIGHT_MM <= A4_HEIGHT_MM);
        }
    }

    #[test]
    fn second_column_clears_the_first() {
        let (x0, _) = batch_slot(0).origin_mm();
        let (x1, _) = batch_slot(1).origin_mm();
        assert!(x1 >= x0 + CARD_WIDTH_MM + PAGE_MARGIN_MM - 1e-9);
    }
}
