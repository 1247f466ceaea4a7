//! Base64-encoded md5 digests, the format object stores prefer for upload
//! integrity metadata.

use base64::{engine::general_purpose, Engine as _};
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

/// Streaming base64 md5 of the file at `path`.
pub fn md5_base64(path: &Path) -> io::Result<String> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut context = md5::Context::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        context.consume(&buf[..n]);
    }
    Ok(general_purpose::STANDARD.encode(context.compute().0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn digest_matches_known_value() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"hello world").unwrap();
        // md5("hello world") = 5eb63bbbe01eeed093cb22bb8f5acdc3
        assert_eq!(
            md5_base64(file.path()).unwrap(),
            "XrY7u+Ae7tCTyyK7j1rNww=="
        );
    }

    #[test]
    fn identical_content_same_digest() {
        let mut a = tempfile::NamedTempFile::new().unwrap();
        let mut b = tempfile::NamedTempFile::new().unwrap();
        a.write_all(b"same bytes").unwrap();
        b.write_all(b"same bytes").unwrap();
        assert_eq!(
            md5_base64(a.path()).unwrap(),
            md5_base64(b.path()).unwrap()
        );
    }
}
