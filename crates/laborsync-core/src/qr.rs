//! QR rendering for snapshot URLs.

use qrcode::render::svg;
use qrcode::{EcLevel, QrCode};

use crate::error::{SnapshotError, SnapshotResult};
use crate::snapshot::{fits_qr, snapshot_url};

/// Render a compressed snapshot as an SVG QR code of its share URL.
///
/// Large sessions overflow QR capacity; callers should offer the relay or
/// copy-paste channel instead when this fails.
pub fn snapshot_qr_svg(compressed: &str, size: u32) -> SnapshotResult<String> {
    if !fits_qr(compressed) {
        return Err(SnapshotError::Qr(format!(
            "snapshot too large for a QR code ({} chars)",
            compressed.len()
        )));
    }

    let url = snapshot_url(compressed);
    let code = QrCode::with_error_correction_level(url.as_bytes(), EcLevel::L)
        .map_err(|e| SnapshotError::Qr(format!("QR encoding failed: {e:?}")))?;

    Ok(code
        .render()
        .min_dimensions(size, size)
        .dark_color(svg::Color("#000000"))
        .light_color(svg::Color("#ffffff"))
        .build())
}
