// Output Protocol Decoder
// Scanning -> (sentinel) -> Decoding -> Done
// Scanning -> (end of stream) -> ProtocolError
// Decoding -> (malformed payload) -> DecodeError

use tracing::debug;

use crate::application::constants::SENTINEL;
use crate::domain::Package;
use crate::error::{ReflectError, Result};

/// Split `stdout` at the sentinel line and return the payload after it
///
/// Lines before the sentinel are diagnostic output. The sentinel only counts
/// when it is a complete, newline-terminated line.
///
/// # Errors
/// - ReflectError::Protocol if the stream ends before the sentinel
pub fn find_payload(stdout: &[u8]) -> Result<&[u8]> {
    let mut rest = stdout;
    let mut skipped = 0usize;

    while let Some(newline) = rest.iter().position(|&b| b == b'\n') {
        let (line, tail) = (&rest[..newline], &rest[newline + 1..]);
        if line == SENTINEL.as_bytes() {
            debug!(skipped_lines = skipped, "Found sentinel");
            return Ok(tail);
        }
        debug!(line = %String::from_utf8_lossy(line), "Probe output");
        skipped += 1;
        rest = tail;
    }

    Err(ReflectError::Protocol(format!(
        "{} line not found after {} line(s) of probe output",
        SENTINEL, skipped
    )))
}

/// Decode the package a probe wrote to stdout
///
/// # Errors
/// - ReflectError::Protocol if the sentinel is missing
/// - ReflectError::Decode if the payload is not exactly one encoded Package
pub fn decode(stdout: &[u8]) -> Result<Package> {
    let payload = find_payload(stdout)?;
    let package: Package = serde_json::from_slice(payload)?;
    debug!(
        package = %package.name,
        interfaces = package.interfaces.len(),
        "Decoded package"
    );
    Ok(package)
}

/// Encode a package the way a probe does: sentinel line, then the payload
pub fn encode(package: &Package) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    out.push(b'\n');
    out.extend_from_slice(SENTINEL.as_bytes());
    out.push(b'\n');
    serde_json::to_writer(&mut out, package)?;
    out.push(b'\n');
    Ok(out)
}
