//! Body extraction and decoding for Gmail MIME payloads.

use base64::{
    Engine as _, alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
};

use crate::{error::DecodeError, types::MessagePart};

const TEXT_PLAIN: &str = "text/plain";

/// URL-safe alphabet, accepting data with or without trailing padding.
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Locates the inline body data of a message payload.
///
/// The payload's own body wins. Otherwise the first `text/plain` part in
/// listed order is used, descending into multipart containers where it meets
/// them. Returns `None` when neither yields data.
pub fn extract_body(payload: &MessagePart) -> Option<&str> {
    if let Some(data) = payload.inline_data() {
        return Some(data);
    }
    first_text_plain(&payload.parts)?.inline_data()
}

fn first_text_plain(parts: &[MessagePart]) -> Option<&MessagePart> {
    parts.iter().find_map(|part| {
        if part.mime_type.as_deref() == Some(TEXT_PLAIN) {
            Some(part)
        } else {
            first_text_plain(&part.parts)
        }
    })
}

/// Decodes base64url inline data into UTF-8 text.
///
/// # Errors
///
/// Returns an error if the data is not valid base64url or the decoded bytes
/// are not valid UTF-8.
pub fn decode_body(data: &str) -> Result<String, DecodeError> {
    let bytes = URL_SAFE_LENIENT.decode(data.trim())?;
    Ok(String::from_utf8(bytes)?)
}
