use std::path::Path;

use encoding_rs::Encoding;

use crate::errors::FileError;

/// Text read from disk along with the encoding it was decoded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedText {
    pub text: String,
    pub encoding: &'static str,
}

pub fn load_text(path: &Path) -> Result<LoadedText, FileError> {
    let bytes = std::fs::read(path).map_err(|source| FileError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let loaded = decode_text_bytes(&bytes);
    tracing::debug!(
        target: "runpad.fileio",
        path = %path.display(),
        encoding = loaded.encoding,
        bytes = bytes.len(),
        "file loaded"
    );
    Ok(loaded)
}

/// Always writes UTF-8, whatever encoding the file was opened with.
pub fn save_text(path: &Path, text: &str) -> Result<(), FileError> {
    std::fs::write(path, text.as_bytes()).map_err(|source| FileError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::debug!(target: "runpad.fileio", path = %path.display(), bytes = text.len(), "file saved");
    Ok(())
}

pub fn decode_text_bytes(bytes: &[u8]) -> LoadedText {
    decode_with_override(bytes, std::env::var("RUNPAD_FILE_ENCODING").ok().as_deref())
}

fn decode_with_override(bytes: &[u8], forced: Option<&str>) -> LoadedText {
    if bytes.is_empty() {
        return LoadedText {
            text: String::new(),
            encoding: encoding_rs::UTF_8.name(),
        };
    }

    if let Some(label) = forced {
        if let Some(enc) = Encoding::for_label(label.trim().as_bytes()) {
            let (cow, _, _) = enc.decode(bytes);
            return LoadedText {
                text: cow.into_owned(),
                encoding: enc.name(),
            };
        }
        tracing::warn!(target: "runpad.fileio", label, "unknown RUNPAD_FILE_ENCODING, detecting instead");
    }

    if let Some((enc, bom_len)) = Encoding::for_bom(bytes) {
        let (cow, _, _) = enc.decode(&bytes[bom_len..]);
        return LoadedText {
            text: cow.into_owned(),
            encoding: enc.name(),
        };
    }

    if let Some(enc) = detect_utf16_encoding(bytes) {
        let (cow, _, _) = enc.decode(bytes);
        return LoadedText {
            text: cow.into_owned(),
            encoding: enc.name(),
        };
    }

    if let Ok(s) = std::str::from_utf8(bytes) {
        return LoadedText {
            text: s.to_string(),
            encoding: encoding_rs::UTF_8.name(),
        };
    }

    // GB18030 (a GBK superset) only when every sequence decodes cleanly.
    let (cow, _, had_err) = encoding_rs::GB18030.decode(bytes);
    if !had_err {
        return LoadedText {
            text: cow.into_owned(),
            encoding: encoding_rs::GB18030.name(),
        };
    }

    // windows-1252 maps every byte, so legacy single-byte files never fail.
    let (cow, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
    LoadedText {
        text: cow.into_owned(),
        encoding: encoding_rs::WINDOWS_1252.name(),
    }
}

/// Guesses UTF-16 without a BOM from the position of zero bytes in a sample.
fn detect_utf16_encoding(bytes: &[u8]) -> Option<&'static Encoding> {
    let sample_len = bytes.len().min(64) & !1;
    if sample_len < 2 {
        return None;
    }

    let (mut zero_even, mut zero_odd) = (0usize, 0usize);
    for (i, b) in bytes.iter().take(sample_len).enumerate() {
        if *b == 0 {
            if i % 2 == 0 {
                zero_even += 1;
            } else {
                zero_odd += 1;
            }
        }
    }

    let half = sample_len / 2;
    if zero_odd * 2 >= half && zero_even == 0 {
        Some(encoding_rs::UTF_16LE)
    } else if zero_even * 2 >= half && zero_odd == 0 {
        Some(encoding_rs::UTF_16BE)
    } else {
        None
    }
}
