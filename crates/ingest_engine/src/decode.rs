use chardetng::EncodingDetector;
use encoding_rs::Encoding;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedText {
    pub text: String,
    pub encoding_label: String,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("failed to decode bytes with {encoding}: {message}")]
    DecodeFailure { encoding: String, message: String },
}

/// Decode a byte sample into UTF-8 using: BOM -> chardetng detection.
///
/// `truncated` marks a sample cut from a longer file; a multi-byte sequence
/// split at its end is then not treated as a decoding error.
pub fn decode_text(bytes: &[u8], truncated: bool) -> Result<DecodedText, DecodeError> {
    if let Some((encoding, _)) = Encoding::for_bom(bytes) {
        return decode_with(bytes, encoding, truncated);
    }

    let mut detector = EncodingDetector::new();
    detector.feed(bytes, !truncated);
    let enc = detector.guess(None, true);
    decode_with(bytes, enc, truncated)
}

fn decode_with(
    bytes: &[u8],
    enc: &'static Encoding,
    truncated: bool,
) -> Result<DecodedText, DecodeError> {
    let max_trim = if truncated { bytes.len().min(3) } else { 0 };
    for trim in 0..=max_trim {
        let (text, _, had_errors) = enc.decode(&bytes[..bytes.len() - trim]);
        if !had_errors {
            return Ok(DecodedText {
                text: text.into_owned(),
                encoding_label: enc.name().to_string(),
            });
        }
    }
    Err(DecodeError::DecodeFailure {
        encoding: enc.name().to_string(),
        message: "decoding error".into(),
    })
}
