use unicode_normalization::UnicodeNormalization;

use crate::model::ChatRequest;

fn clean_text(s: &str) -> String {
    // Unicode NFC normalization + BOM strip + CRLF -> LF + trim
    let mut t = s.nfc().collect::<String>();
    if t.starts_with('\u{FEFF}') {
        t.remove(0);
    }
    if t.contains("\r\n") {
        t = t.replace("\r\n", "\n");
    }
    t.trim().to_string()
}

/// Tidies an outgoing request before it is serialized: the message,
/// session id and every history entry are cleaned, and history entries
/// whose content cleans down to nothing are dropped.
pub fn normalize_request(mut req: ChatRequest) -> ChatRequest {
    req.message = clean_text(&req.message);
    req.session_id = req.session_id.trim().to_string();
    for msg in &mut req.conversation_history {
        msg.content = clean_text(&msg.content);
    }
    req.conversation_history.retain(|m| !m.content.is_empty());
    req
}
