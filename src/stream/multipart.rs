// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//! multipart/x-mixed-replace 分帧

/// Boundary token separating parts. Clients depend on it; never change it.
pub const BOUNDARY: &str = "frame";

/// Response content type matching [`BOUNDARY`].
pub const CONTENT_TYPE: &str = "multipart/x-mixed-replace; boundary=frame";

/// `--frame\r\nContent-Type: <type>\r\n\r\n<payload>\r\n`
pub fn frame_part(content_type: &str, payload: &[u8]) -> Vec<u8> {
    let header = format!("--{}\r\nContent-Type: {}\r\n\r\n", BOUNDARY, content_type);
    let mut part = Vec::with_capacity(header.len() + payload.len() + 2);
    part.extend_from_slice(header.as_bytes());
    part.extend_from_slice(payload);
    part.extend_from_slice(b"\r\n");
    part
}
