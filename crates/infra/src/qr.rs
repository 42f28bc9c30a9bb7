//! # 受け取りコードの QR 描画
//!
//! 受け取りコードをカウンターの端末で読み取れる SVG 画像にする。

use bookshelf_domain::reservation::{PickupCode, ReservationId};
use qrcode::{QrCode, render::svg};

use crate::InfraError;

/// 画像の MIME タイプ
pub const QR_CONTENT_TYPE: &str = "image/svg+xml";

/// 受け取りコードを SVG の QR コードとして描画する
pub fn render_pickup_code_svg(code: &PickupCode) -> Result<Vec<u8>, InfraError> {
    let qr = QrCode::new(code.as_str().as_bytes())
        .map_err(|e| InfraError::rendering(format!("QR コードの生成に失敗: {e}")))?;

    let image = qr
        .render::<svg::Color<'_>>()
        .min_dimensions(200, 200)
        .quiet_zone(true)
        .build();

    Ok(image.into_bytes())
}

/// 予約ごとの画像のオブジェクトキー
pub fn pickup_code_object_key(reservation_id: &ReservationId) -> String {
    format!("pickup-codes/{reservation_id}.svg")
}
