use anyhow::anyhow;
use image::{ImageBuffer, Luma};
use qirust::qrcode::{QrCode, QrCodeEcc, Version};
use serde::{Deserialize, Serialize};

use crate::model::Student;

/// Pixel width of the code embedded on batch-card thumbnails.
pub const BATCH_QR_WIDTH: u32 = 60;
/// Pixel width of the code shown on the single-card view.
pub const SINGLE_QR_WIDTH: u32 = 100;

/// Quiet zone around the symbol, in modules.
const QUIET_ZONE: i32 = 1;

/// Minimal identity payload carried by the scannable code. `dept` is the
/// on-wire key for the department name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QrPayload {
    pub id: String,
    pub name: String,
    pub matric: String,
    pub dept: String,
}

impl QrPayload {
    pub fn for_student(s: &Student) -> QrPayload {
        QrPayload {
            id: s.student_id.clone(),
            name: format!("{} {}", s.first_name, s.last_name),
            matric: s.matric_no.clone(),
            dept: s.department.clone(),
        }
    }

    pub fn to_json(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Encodes `content` at error-correction level Medium and returns the module
/// matrix as `(size, row-major dark flags)`.
pub fn modules(content: &str) -> anyhow::Result<(usize, Vec<bool>)> {
    let mut outbuffer = vec![0u8; Version::MAX.buffer_len()];
    let mut tempbuffer = vec![0u8; Version::MAX.buffer_len()];
    let qr = QrCode::encode_text(
        content,
        &mut tempbuffer,
        &mut outbuffer,
        QrCodeEcc::Medium,
        Version::MIN,
        Version::MAX,
        None,
        true,
    )
    .map_err(|e| anyhow!("qr encode failed: {:?}", e))?;

    let size = qr.size();
    let mut cells = Vec::with_capacity((size * size) as usize);
    for y in 0..size {
        for x in 0..size {
            cells.push(qr.get_module(x, y));
        }
    }
    Ok((size as usize, cells))
}

/// Rasterizes `content` into a square grayscale image of exactly
/// `target_px` pixels a side, quiet zone included.
pub fn render_image(
    content: &str,
    target_px: u32,
) -> anyhow::Result<ImageBuffer<Luma<u8>, Vec<u8>>> {
    let (size, cells) = modules(content)?;
    let dim = size as i64 + 2 * QUIET_ZONE as i64;

    let mut img = ImageBuffer::new(target_px, target_px);
    for (x, y, pixel) in img.enumerate_pixels_mut() {
        let mx = (x as i64 * dim) / target_px as i64 - QUIET_ZONE as i64;
        let my = (y as i64 * dim) / target_px as i64 - QUIET_ZONE as i64;
        let dark = mx >= 0
            && my >= 0
            && (mx as usize) < size
            && (my as usize) < size
            && cells[my as usize * size + mx as usize];
        *pixel = if dark { Luma([0u8]) } else { Luma([255u8]) };
    }
    Ok(img)
}
