//! Pairing code rendering
//!
//! Turns a handshake code into the image shown to the user (a PNG QR code).

use anyhow::{Context, Result};
use base64::Engine;
use image::{ImageFormat, Luma};
use qrcode::{EcLevel, QrCode};
use std::io::Cursor;

/// Minimum edge length of the rendered QR image, in pixels
pub const QR_SIZE_PX: u32 = 256;

/// Encode a pairing code as a PNG QR image (medium error correction)
pub fn encode_pairing_code(code: &str) -> Result<Vec<u8>> {
    let qr = QrCode::with_error_correction_level(code.as_bytes(), EcLevel::M)
        .context("Pairing code does not fit in a QR code")?;

    let image = qr
        .render::<Luma<u8>>()
        .min_dimensions(QR_SIZE_PX, QR_SIZE_PX)
        .build();

    let mut png = Cursor::new(Vec::new());
    image
        .write_to(&mut png, ImageFormat::Png)
        .context("Failed to encode QR image as PNG")?;

    Ok(png.into_inner())
}

/// `data:` URI for embedding a PNG payload in an `<img>` tag
pub fn png_data_uri(png: &[u8]) -> String {
    format!(
        "data:image/png;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(png)
    )
}
