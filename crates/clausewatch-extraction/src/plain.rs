use encoding_rs::{Encoding, UTF_8};

/// Decode plain text.
///
/// A byte-order mark selects UTF-8 or UTF-16 and is stripped. Without one the
/// bytes are read as UTF-8, replacing invalid sequences.
pub(crate) fn decode(bytes: &[u8]) -> String {
    let (encoding, bom_len) = Encoding::for_bom(bytes).unwrap_or((UTF_8, 0));
    let (text, had_errors) = encoding.decode_without_bom_handling(&bytes[bom_len..]);
    if had_errors {
        tracing::warn!(
            encoding = encoding.name(),
            "document contains invalid byte sequences; replaced"
        );
    }
    text.into_owned()
}
