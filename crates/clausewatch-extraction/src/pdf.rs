use clausewatch_utils::error::ExtractionError;
use lopdf::Document;

/// Concatenate the text of every page, in page order.
pub(crate) fn extract(bytes: &[u8]) -> Result<String, ExtractionError> {
    let doc = Document::load_mem(bytes).map_err(|e| ExtractionError::Pdf(e.to_string()))?;

    if doc.is_encrypted() {
        return Err(ExtractionError::Pdf("document is encrypted".to_string()));
    }

    let page_numbers: Vec<u32> = doc.get_pages().keys().copied().collect();
    let mut text = String::new();
    for page in page_numbers {
        // A single unreadable page should not discard the rest of the contract.
        match doc.extract_text(&[page]) {
            Ok(page_text) => {
                text.push_str(&page_text);
                if !page_text.ends_with('\n') {
                    text.push('\n');
                }
            }
            Err(e) => tracing::warn!(page, error = %e, "skipping unreadable PDF page"),
        }
    }
    Ok(text)
}
