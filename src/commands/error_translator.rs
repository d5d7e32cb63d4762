//! プラットフォームエラーをチャットの返信に変換する
//!
//! プラットフォーム呼び出しの失敗はすべてここを通して報告する。
//! ハンドラが独自にエラー返信を組み立てることはしない。

use crate::api::control_surface::{ControlSurface, MessageId, PlatformError};
use crate::commands::messages;

/// 返信文を決める。構造化エラーの `message` があればそれ、なければ汎用メッセージ
pub fn reply_text(error: &PlatformError) -> String {
    error
        .api_message()
        .unwrap_or_else(|| messages::GENERIC_ERROR.to_string())
}

/// エラーをログに出し、元のメッセージに返信する
pub async fn report<S>(surface: &S, error: &PlatformError, reply_to: &MessageId)
where
    S: ControlSurface + ?Sized,
{
    match error {
        PlatformError::StructuredApi { status_code, body } => {
            tracing::error!(
                status_code = *status_code,
                body = %body,
                "❌ [ERROR_TRANSLATOR] Platform API error"
            );
        }
        PlatformError::Other { message } => {
            tracing::error!(message = %message, "❌ [ERROR_TRANSLATOR] Platform call failed");
        }
    }

    let text = reply_text(error);
    if let Err(e) = surface.reply(reply_to, &text).await {
        tracing::error!("❌ [ERROR_TRANSLATOR] Failed to deliver error reply: {}", e);
    }
}
