use std::path::Path;

use image::{GrayImage, ImageFormat, Luma};
use qrcode::{Color, QrCode};

/// Modules of white border around the code, as required by the QR standard
const QUIET_ZONE: usize = 4;

/// Possible errors to occur while producing a verification image
#[derive(Debug, thiserror::Error)]
pub enum VerificationError {
    #[error("Failed to encode the verification code: {0}")]
    Encode(qrcode::types::QrError),
    #[error("The verification image size must not be zero")]
    EmptyImage,
    #[error("Failed to write the verification image: {0}")]
    Write(#[from] image::ImageError),
}

/// The text encoded in a student's verification code
pub fn verification_payload(identifier: &str, base: u32) -> String {
    format!("Invoice for Student ID: {}\nAmount: Rs. {}", identifier, base)
}

/// Encodes `payload` as a QR code and writes it as a square PNG
///
/// The image is `size` pixels wide and high, including the quiet zone. Each
/// pixel takes the color of the module it falls into. Sizes below one pixel
/// per module are raised to that minimum.
pub fn write_verification_image(
    payload: &str,
    size: u32,
    path: impl AsRef<Path>,
) -> Result<(), VerificationError> {
    let image = render(payload, size)?;
    image.save_with_format(path, ImageFormat::Png)?;

    Ok(())
}

fn render(payload: &str, size: u32) -> Result<GrayImage, VerificationError> {
    if size == 0 {
        return Err(VerificationError::EmptyImage);
    }

    let code = QrCode::new(payload.as_bytes()).map_err(VerificationError::Encode)?;
    let width = code.width();
    let colors = code.to_colors();
    let modules = width + 2 * QUIET_ZONE;
    let size = size.max(modules as u32);

    let image = GrayImage::from_fn(size, size, |x, y| {
        let module_x = x as usize * modules / size as usize;
        let module_y = y as usize * modules / size as usize;
        let dark = match (module_x.checked_sub(QUIET_ZONE), module_y.checked_sub(QUIET_ZONE)) {
            (Some(mx), Some(my)) if mx < width && my < width => colors[my * width + mx] == Color::Dark,
            _ => false,
        };

        match dark {
            true => Luma([0]),
            false => Luma([255]),
        }
    });

    Ok(image)
}
