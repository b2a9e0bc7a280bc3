//! QR code rendering: terminal art, PNG bytes, and PNG data URLs.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use wasend_core::error::WasendError;

/// Generate a compact QR code for terminal display using Unicode half-block characters.
///
/// Packs two rows of modules into one line of text using `▀`, `▄`, `█`, and space.
pub fn generate_qr_terminal(qr_data: &str) -> Result<String, WasendError> {
    use qrcode::{Color, EcLevel, QrCode};

    let code = QrCode::with_error_correction_level(qr_data.as_bytes(), EcLevel::L)
        .map_err(|e| WasendError::Client(format!("QR generation failed: {e}")))?;

    let width = code.width();
    let colors: Vec<Color> = code.into_colors();
    let is_dark = |row: usize, col: usize| -> bool {
        row < width && col < width && colors[row * width + col] == Color::Dark
    };

    let mut out = String::new();
    for row in (0..width).step_by(2) {
        for col in 0..width {
            out.push(match (is_dark(row, col), is_dark(row + 1, col)) {
                (true, true) => '█',
                (true, false) => '▀',
                (false, true) => '▄',
                (false, false) => ' ',
            });
        }
        out.push('\n');
    }

    Ok(out)
}

/// Generate a QR code as PNG image bytes.
///
/// `scale` is the edge length of one module in pixels; a 4-module quiet
/// zone surrounds the code.
pub fn generate_qr_image(qr_data: &str, scale: u32) -> Result<Vec<u8>, WasendError> {
    use image::{ImageBuffer, Luma};
    use qrcode::{Color, EcLevel, QrCode};

    let code = QrCode::with_error_correction_level(qr_data.as_bytes(), EcLevel::M)
        .map_err(|e| WasendError::Client(format!("QR generation failed: {e}")))?;

    let module_size = scale.max(1);
    let quiet_zone: u32 = 4;
    let modules = code.width() as u32;
    let img_size = (modules + quiet_zone * 2) * module_size;

    let img = ImageBuffer::from_fn(img_size, img_size, |x, y| {
        let (cx, cy) = (x / module_size, y / module_size);
        if cx < quiet_zone
            || cy < quiet_zone
            || cx - quiet_zone >= modules
            || cy - quiet_zone >= modules
        {
            return Luma([255u8]);
        }
        match code[((cx - quiet_zone) as usize, (cy - quiet_zone) as usize)] {
            Color::Dark => Luma([0u8]),
            Color::Light => Luma([255u8]),
        }
    });

    let mut buf = std::io::Cursor::new(Vec::new());
    img.write_to(&mut buf, image::ImageFormat::Png)
        .map_err(|e| WasendError::Client(format!("PNG encoding failed: {e}")))?;

    Ok(buf.into_inner())
}

/// Render a QR payload as a `data:image/png;base64,...` URL for the browser.
pub fn qr_data_url(qr_data: &str, scale: u32) -> Result<String, WasendError> {
    let png = generate_qr_image(qr_data, scale)?;
    Ok(format!("data:image/png;base64,{}", BASE64.encode(png)))
}
