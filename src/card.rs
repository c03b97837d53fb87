use serde::Serialize;

use crate::model::{format_card_date, Student};
use crate::qr::QrPayload;

/// Standard credit-card dimensions, in millimetres.
pub const CARD_WIDTH_MM: f64 = 85.6;
pub const CARD_HEIGHT_MM: f64 = 53.98;

/// Height of the white institution band at the top of the front face.
pub const HEADER_HEIGHT_MM: f64 = 15.0;

pub const DEFAULT_INSTITUTION: &str = "UNIVERSITY OF EXCELLENCE";
pub const CARD_SUBTITLE: &str = "STUDENT IDENTIFICATION CARD";

/// Named palette entries so every surface renders the same colours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Ink {
    White,
    Blue,
    PhotoGray,
    InitialsGray,
    Heading,
    Body,
    Footnote,
}

impl Ink {
    /// RGB components in the 0.0..=1.0 range expected by the PDF surface.
    pub fn rgb(self) -> (f64, f64, f64) {
        let (r, g, b) = match self {
            Ink::White => (255, 255, 255),
            Ink::Blue => (30, 64, 175),
            Ink::PhotoGray => (200, 200, 200),
            Ink::InitialsGray => (100, 100, 100),
            Ink::Heading => (17, 24, 39),
            Ink::Body => (55, 65, 81),
            Ink::Footnote => (75, 85, 99),
        };
        (r as f64 / 255.0, g as f64 / 255.0, b as f64 / 255.0)
    }
}

/// Filled rectangle. Coordinates are millimetres from the card's top-left.
#[derive(Debug, Clone, Serialize)]
pub struct RectSpec {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
    pub ink: Ink,
}

/// One run of text. `y` is the baseline; `centered` centres on `x`.
#[derive(Debug, Clone, Serialize)]
pub struct TextSpec {
    pub text: String,
    pub x: f64,
    pub y: f64,
    pub size_pt: f64,
    pub bold: bool,
    pub ink: Ink,
    pub centered: bool,
}

/// Photo box with the initials fallback to draw when no photo is on file.
#[derive(Debug, Clone, Serialize)]
pub struct PhotoSlot {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
    pub photo_url: Option<String>,
    pub initials: String,
}

/// Where the scannable code sits and what it carries.
#[derive(Debug, Clone, Serialize)]
pub struct QrSlot {
    pub x: f64,
    pub y: f64,
    pub size: f64,
    pub payload: String,
}

/// Surface-independent description of one printable card side. The PDF
/// writer and the on-screen view both consume this, so the two can never
/// drift apart.
#[derive(Debug, Clone, Serialize)]
pub struct CardFace {
    pub width: f64,
    pub height: f64,
    pub background: Ink,
    pub rects: Vec<RectSpec>,
    pub texts: Vec<TextSpec>,
    pub photo: Option<PhotoSlot>,
    pub qr: Option<QrSlot>,
}

/// Front face: institution band, photo box, identity lines and QR slot.
pub fn front_face(student: &Student, institution: &str) -> anyhow::Result<CardFace> {
    let w = CARD_WIDTH_MM;
    let payload = QrPayload::for_student(student).to_json()?;

    let rects = vec![RectSpec {
        x: 0.0,
        y: 0.0,
        w,
        h: HEADER_HEIGHT_MM,
        ink: Ink::White,
    }];

    let mut texts = vec![
        TextSpec {
            text: institution.to_uppercase(),
            x: w / 2.0,
            y: 6.0,
            size_pt: 8.0,
            bold: true,
            ink: Ink::Blue,
            centered: true,
        },
        TextSpec {
            text: CARD_SUBTITLE.to_string(),
            x: w / 2.0,
            y: 10.0,
            size_pt: 6.0,
            bold: false,
            ink: Ink::Blue,
            centered: true,
        },
        TextSpec {
            text: student.display_name_upper(),
            x: 20.0,
            y: 22.0,
            size_pt: 8.0,
            bold: true,
            ink: Ink::White,
            centered: false,
        },
    ];

    let info_lines = [
        format!("ID: {}", student.student_id),
        format!("Matric: {}", student.matric_no),
        format!("Dept: {}", student.department),
        format!("Level: {}", student.level),
        format!("Expires: {}", format_card_date(&student.expiry_date)),
    ];
    for (i, line) in info_lines.into_iter().enumerate() {
        texts.push(TextSpec {
            text: line,
            x: 20.0,
            y: 28.0 + i as f64 * 4.0,
            size_pt: 6.0,
            bold: false,
            ink: Ink::White,
            centered: false,
        });
    }

    Ok(CardFace {
        width: w,
        height: CARD_HEIGHT_MM,
        background: Ink::Blue,
        rects,
        texts,
        photo: Some(PhotoSlot {
            x: 3.0,
            y: 18.0,
            w: 14.0,
            h: 18.0,
            photo_url: student.photo_url.clone(),
            initials: student.initials(),
        }),
        qr: Some(QrSlot {
            x: w - 18.0,
            y: 20.0,
            size: 15.0,
            payload,
        }),
    })
}

/// Back face: emergency information and the issue date.
pub fn back_face(student: &Student) -> CardFace {
    let w = CARD_WIDTH_MM;
    let h = CARD_HEIGHT_MM;

    let mut texts = vec![TextSpec {
        text: "EMERGENCY INFORMATION".to_string(),
        x: w / 2.0,
        y: 8.0,
        size_pt: 8.0,
        bold: true,
        ink: Ink::Heading,
        centered: true,
    }];

    let mut lines = vec![
        format!("Emergency Contact: {}", student.emergency_contact),
        format!("Emergency Phone: {}", student.emergency_phone),
    ];
    if let Some(group) = student.blood_group.as_deref() {
        if !group.is_empty() {
            lines.push(format!("Blood Group: {}", group));
        }
    }
    lines.push(format!("Address: {}", student.address));

    for (i, line) in lines.into_iter().enumerate() {
        texts.push(TextSpec {
            text: line,
            x: 6.0,
            y: 16.0 + i as f64 * 4.5,
            size_pt: 6.0,
            bold: false,
            ink: Ink::Body,
            centered: false,
        });
    }

    texts.push(TextSpec {
        text: "If found, please return to University Security".to_string(),
        x: w / 2.0,
        y: h - 9.0,
        size_pt: 5.0,
        bold: false,
        ink: Ink::Footnote,
        centered: true,
    });
    texts.push(TextSpec {
        text: format!("Issued: {}", format_card_date(&student.date_registered)),
        x: w / 2.0,
        y: h - 5.0,
        size_pt: 5.0,
        bold: true,
        ink: Ink::Footnote,
        centered: true,
    });

    CardFace {
        width: w,
        height: h,
        background: Ink::White,
        rects: Vec::new(),
        texts,
        photo: None,
        qr: None,
    }
}
