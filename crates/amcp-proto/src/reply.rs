//! Reply-line formatting.
//!
//! AMCP replies are sent as `{code} {text}\r\n`, prefixed with
//! `RES {id} ` when the request carried a `REQ {id}` token. Handler
//! return values already contain the full body; this module only takes
//! care of the prefix and the terminator.

/// Format a reply body for the wire.
///
/// Prepends `RES {id} ` when a request id is present and guarantees the
/// line ends with `\r\n` without doubling an existing terminator.
pub fn format_reply(request_id: Option<&str>, body: &str) -> String {
    let mut out = String::with_capacity(body.len() + 16);

    if let Some(id) = request_id {
        out.push_str("RES ");
        out.push_str(id);
        out.push(' ');
    }

    out.push_str(body);
    if !out.ends_with("\r\n") {
        out.push_str("\r\n");
    }

    out
}
