use qrcode::{render::unicode, QrCode};
use std::error::Error;
use std::fmt;

#[derive(Debug)]
pub enum QrError {
    EmptyInput,
    Encoding(qrcode::types::QrError),
}

impl fmt::Display for QrError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            QrError::EmptyInput => write!(f, "Nothing to encode"),
            QrError::Encoding(e) => write!(f, "Failed to encode QR code: {}", e),
        }
    }
}

impl Error for QrError {}

impl From<qrcode::types::QrError> for QrError {
    fn from(err: qrcode::types::QrError) -> Self {
        QrError::Encoding(err)
    }
}

/// Renders `text` as a QR code of unicode half blocks, inverted so it scans
/// on dark terminal backgrounds.
pub fn render_qr(text: &str) -> Result<String, QrError> {
    if text.is_empty() {
        return Err(QrError::EmptyInput);
    }
    let code = QrCode::new(text.as_bytes())?;
    Ok(code
        .render::<unicode::Dense1x2>()
        .dark_color(unicode::Dense1x2::Light)
        .light_color(unicode::Dense1x2::Dark)
        .build())
}

pub fn print_qr(label: &str, text: &str) -> Result<(), QrError> {
    let rendered = render_qr(text)?;
    println!("{}:\n{}", label, rendered);
    Ok(())
}
