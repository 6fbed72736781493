//! # HTTP content negotiation
//!
//! Pure decision functions an external HTTP layer calls when serving an
//! archive entry over the wire (§6). This crate never binds a socket or
//! depends on an HTTP framework -- hosting the archive is explicitly an
//! external collaborator's job (§1) -- but the negotiation rules
//! themselves are simple enough to own and unit-test here.

/// Whether a response should carry the entry's bytes Brotli-encoded or
/// decompressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Brotli,
    Identity,
}

/// An entry that is itself a `.br` file is always served as-is; otherwise
/// the client's `Accept-Encoding` header decides.
pub fn negotiate_encoding(is_br_entry: bool, accept_encoding: &str) -> Encoding {
    if is_br_entry || accept_encoding.to_ascii_lowercase().contains("br") {
        Encoding::Brotli
    } else {
        Encoding::Identity
    }
}

/// Infers a `Content-Type` from `original_filename`, stripping one
/// trailing `.br` first so a precompressed `app.wasm.br` still reports
/// `application/wasm`.
pub fn media_type_for(original_filename: &str) -> &'static str {
    let stripped = original_filename.strip_suffix(".br").unwrap_or(original_filename);
    let ext = stripped.rsplit('.').next().unwrap_or("").to_ascii_lowercase();
    match ext.as_str() {
        "wasm" => "application/wasm",
        "js" | "mjs" => "application/javascript",
        "json" => "application/json",
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "txt" => "text/plain",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "ico" => "image/x-icon",
        "mp3" => "audio/mpeg",
        "ogg" => "audio/ogg",
        "wav" => "audio/wav",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        _ => "application/octet-stream",
    }
}

/// The two cross-origin-isolation headers that accompany every response
/// serving an archive entry.
pub fn cross_origin_isolation_headers() -> [(&'static str, &'static str); 2] {
    [("Cross-Origin-Opener-Policy", "same-origin"), ("Cross-Origin-Embedder-Policy", "require-corp")]
}
