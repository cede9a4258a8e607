//! Input validation: confirm the user-supplied path is a readable PDF.
//!
//! Checks happen before any output directory is created, so a bad path
//! fails fast with an error naming the problem instead of a pdfium crash.

use crate::error::UniAiError;
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Leading bytes of every PDF file.
const PDF_MAGIC: &[u8; 4] = b"%PDF";

/// Check that `path` is an existing regular file that starts with `%PDF`.
///
/// Files shorter than four bytes are left for pdfium to reject.
pub fn validate_pdf(path: &Path) -> Result<(), UniAiError> {
    if !path.exists() {
        return Err(UniAiError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    if !path.is_file() {
        return Err(UniAiError::NotAFile {
            path: path.to_path_buf(),
        });
    }

    let mut file = match std::fs::File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(UniAiError::PermissionDenied {
                path: path.to_path_buf(),
            });
        }
        Err(_) => {
            return Err(UniAiError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
    };

    let mut magic = [0u8; 4];
    match file.read_exact(&mut magic) {
        Ok(()) if &magic != PDF_MAGIC => {
            return Err(UniAiError::NotAPdf {
                path: path.to_path_buf(),
                magic,
            });
        }
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {}
        Err(source) => {
            return Err(UniAiError::InputReadFailed {
                path: path.to_path_buf(),
                source,
            });
        }
    }

    debug!("Validated PDF input: {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file() {
        let err = validate_pdf(Path::new("/no/such/file.pdf")).unwrap_err();
        assert!(matches!(err, UniAiError::FileNotFound { .. }));
    }

    #[test]
    fn wrong_magic() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"PK\x03\x04rest").unwrap();
        let err = validate_pdf(f.path()).unwrap_err();
        match err {
            UniAiError::NotAPdf { magic, .. } => assert_eq!(&magic, b"PK\x03\x04"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn pdf_magic_accepted() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"%PDF-1.7\n").unwrap();
        assert!(validate_pdf(f.path()).is_ok());
    }

    #[test]
    fn directory_is_not_a_pdf_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = validate_pdf(dir.path()).unwrap_err();
        assert!(matches!(err, UniAiError::NotAFile { .. }), "got: {err:?}");
    }

    #[test]
    fn short_file_is_left_for_pdfium() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"%P").unwrap();
        assert!(validate_pdf(f.path()).is_ok());

        let empty = tempfile::NamedTempFile::new().unwrap();
        assert!(validate_pdf(empty.path()).is_ok());
    }
}
