//! # Archive Handling
//!
//! In-memory decompression of inbound zips plus the pure content validator
//! that compares an extracted listing against the manifest for the
//! attempt's response type. Extraction failures are technical (the archive
//! may be a truncated upload and a redelivery can succeed); validation
//! failures are structural and never retried.

pub mod validator;

use crate::constants::error_codes;
use crate::error::{Result, RtaError};
use std::io::{Cursor, Read};

pub use validator::{ZipContentValidator, ZipValidationError};

/// One file extracted from an archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedFile {
    pub name: String,
    pub contents: Vec<u8>,
}

/// Decompress a zip payload, excluding directory entries.
///
/// Entry names are taken from the archive metadata with any leading path
/// segments dropped; interior naming rules apply to the bare filename.
pub fn unpack(bytes: &[u8]) -> Result<Vec<ExtractedFile>> {
    let cursor = Cursor::new(bytes);
    let mut archive = zip::ZipArchive::new(cursor).map_err(|e| {
        RtaError::technical(
            error_codes::ARCHIVO_CORRUPTO,
            "unpack",
            format!("cannot open archive: {e}"),
        )
    })?;

    let mut files = Vec::new();
    for index in 0..archive.len() {
        let mut entry = archive.by_index(index).map_err(|e| {
            RtaError::technical(
                error_codes::ARCHIVO_CORRUPTO,
                "unpack",
                format!("cannot read entry {index}: {e}"),
            )
        })?;

        if entry.is_dir() {
            continue;
        }

        let name = entry
            .name()
            .rsplit('/')
            .next()
            .unwrap_or(entry.name())
            .to_string();

        let mut contents = Vec::with_capacity(entry.size() as usize);
        entry.read_to_end(&mut contents).map_err(|e| {
            RtaError::technical(
                error_codes::ARCHIVO_CORRUPTO,
                "unpack",
                format!("cannot decompress '{name}': {e}"),
            )
        })?;

        files.push(ExtractedFile { name, contents });
    }

    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::FileOptions;

    fn build_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut buffer = Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut buffer);
            for (name, contents) in entries {
                writer.start_file(*name, FileOptions::default()).unwrap();
                writer.write_all(contents).unwrap();
            }
            writer.finish().unwrap();
        }
        buffer.into_inner()
    }

    #[test]
    fn test_unpack_excludes_directories() {
        let mut buffer = Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut buffer);
            writer
                .add_directory("carpeta/", FileOptions::default())
                .unwrap();
            writer
                .start_file("carpeta/RE_PRUEBA-01.txt", FileOptions::default())
                .unwrap();
            writer.write_all(b"contenido").unwrap();
            writer.finish().unwrap();
        }

        let files = unpack(&buffer.into_inner()).unwrap();
        assert_eq!(files.len(), 1);
        // leading path segments dropped
        assert_eq!(files[0].name, "RE_PRUEBA-01.txt");
        assert_eq!(files[0].contents, b"contenido");
    }

    #[test]
    fn test_unpack_preserves_order_and_contents() {
        let bytes = build_zip(&[("a-01.txt", b"uno"), ("b-02.txt", b"dos")]);
        let files = unpack(&bytes).unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].contents, b"uno");
        assert_eq!(files[1].name, "b-02.txt");
    }

    #[test]
    fn test_corrupt_archive_is_technical() {
        let err = unpack(b"not a zip at all").unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(err.error_code(), Some(error_codes::ARCHIVO_CORRUPTO));
    }
}
