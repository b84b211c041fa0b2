use aliri_braid::braid;
use std::fmt;

/// An opaque bearer credential accepted by both backing services
///
/// Exactly one credential is live at a time; no history is retained. The
/// `Debug` and `Display` renderings hide the raw value so that a token cannot
/// end up in logs by accident. Use [`as_str`][AccessTokenRef::as_str] when the
/// raw value is genuinely needed, such as when building an `Authorization`
/// header.
#[braid(serde, debug = "owned", display = "owned")]
pub struct AccessToken;

impl fmt::Debug for AccessTokenRef {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if f.alternate() {
            f.write_str("\"")?;
            limited_reveal(&self.0, &mut *f, 15)?;
            f.write_str("\"")
        } else {
            f.write_str("***ACCESS TOKEN***")
        }
    }
}

impl fmt::Display for AccessTokenRef {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if f.alternate() {
            limited_reveal(&self.0, &mut *f, usize::MAX)
        } else {
            f.write_str("***ACCESS TOKEN***")
        }
    }
}

fn limited_reveal(unprotected: &str, f: &mut fmt::Formatter, default_len: usize) -> fmt::Result {
    let max_len = f.width().unwrap_or(default_len);
    if max_len <= 1 {
        f.write_str("…")
    } else if max_len > unprotected.len() {
        f.write_str(unprotected)
    } else {
        match unprotected.char_indices().nth(max_len - 2) {
            Some((idx, c)) if idx + c.len_utf8() < unprotected.len() => {
                f.write_str(&unprotected[0..idx + c.len_utf8()])?;
                f.write_str("…")
            }
            _ => f.write_str(unprotected),
        }
    }
}

/// A correlation identifier attached to a single request attempt
///
/// Ids are opaque and unique per attempt. A transparent replay after a token
/// refresh reuses the id of the original attempt; only a request re-entered
/// from scratch receives a new one.
#[braid(serde)]
pub struct RequestId;
