//! Minimal EXIF reader: finds the ImageDescription tag in IFD0 of a JPEG.

use crate::error::SourceError;

const APP1: u8 = 0xE1;
const SOS: u8 = 0xDA;
const EOI: u8 = 0xD9;
const EXIF_HEADER: &[u8] = b"Exif\0\0";

const IMAGE_DESCRIPTION: u16 = 0x010E;
const TYPE_ASCII: u16 = 2;
const IFD_ENTRY_LEN: usize = 12;

fn truncated() -> SourceError {
    SourceError::Metadata("truncated EXIF data".to_string())
}

/// Return the ImageDescription of a JPEG, without trailing NULs
pub fn image_description(jpeg: &[u8]) -> Result<String, SourceError> {
    let tiff = exif_payload(jpeg)?;
    read_image_description(tiff)
}

/// Walk the marker segments up to the first scan and return the TIFF
/// payload of the Exif APP1 segment
fn exif_payload(jpeg: &[u8]) -> Result<&[u8], SourceError> {
    if !jpeg.starts_with(&[0xFF, 0xD8]) {
        return Err(SourceError::Metadata("not a JPEG image".to_string()));
    }

    let mut pos = 2;
    while pos + 4 <= jpeg.len() {
        if jpeg[pos] != 0xFF {
            return Err(SourceError::Metadata(format!(
                "corrupt JPEG marker at offset {}",
                pos
            )));
        }

        let marker = jpeg[pos + 1];
        match marker {
            // fill byte
            0xFF => {
                pos += 1;
                continue;
            }
            SOS | EOI => break,
            // standalone markers carry no length
            0x01 | 0xD0..=0xD7 => {
                pos += 2;
                continue;
            }
            _ => {}
        }

        let len = u16::from_be_bytes([jpeg[pos + 2], jpeg[pos + 3]]) as usize;
        let end = pos + 2 + len;
        if len < 2 || end > jpeg.len() {
            return Err(truncated());
        }

        let segment = &jpeg[pos + 4..end];
        if marker == APP1 && segment.starts_with(EXIF_HEADER) {
            return Ok(&segment[EXIF_HEADER.len()..]);
        }
        pos = end;
    }

    Err(SourceError::Metadata("no EXIF segment found".to_string()))
}

#[derive(Clone, Copy)]
enum ByteOrder {
    Little,
    Big,
}

struct Tiff<'a> {
    data: &'a [u8],
    order: ByteOrder,
}

impl<'a> Tiff<'a> {
    fn u16_at(&self, offset: usize) -> Result<u16, SourceError> {
        let bytes: [u8; 2] = self
            .data
            .get(offset..offset + 2)
            .and_then(|b| b.try_into().ok())
            .ok_or_else(truncated)?;
        Ok(match self.order {
            ByteOrder::Little => u16::from_le_bytes(bytes),
            ByteOrder::Big => u16::from_be_bytes(bytes),
        })
    }

    fn u32_at(&self, offset: usize) -> Result<u32, SourceError> {
        let bytes: [u8; 4] = self
            .data
            .get(offset..offset + 4)
            .and_then(|b| b.try_into().ok())
            .ok_or_else(truncated)?;
        Ok(match self.order {
            ByteOrder::Little => u32::from_le_bytes(bytes),
            ByteOrder::Big => u32::from_be_bytes(bytes),
        })
    }
}

fn read_image_description(data: &[u8]) -> Result<String, SourceError> {
    let order = match data.get(0..2) {
        Some([0x49, 0x49]) => ByteOrder::Little,
        Some([0x4D, 0x4D]) => ByteOrder::Big,
        _ => return Err(SourceError::Metadata("bad TIFF byte order".to_string())),
    };
    let tiff = Tiff { data, order };

    if tiff.u16_at(2)? != 42 {
        return Err(SourceError::Metadata("bad TIFF magic".to_string()));
    }

    let ifd0 = tiff.u32_at(4)? as usize;
    let count = tiff.u16_at(ifd0)? as usize;

    for i in 0..count {
        let entry = ifd0 + 2 + i * IFD_ENTRY_LEN;
        if tiff.u16_at(entry)? != IMAGE_DESCRIPTION {
            continue;
        }

        if tiff.u16_at(entry + 2)? != TYPE_ASCII {
            return Err(SourceError::Metadata(
                "ImageDescription is not an ASCII value".to_string(),
            ));
        }

        let len = tiff.u32_at(entry + 4)? as usize;
        // values of up to four bytes are stored inline
        let start = if len <= 4 {
            entry + 8
        } else {
            tiff.u32_at(entry + 8)? as usize
        };
        let raw = start
            .checked_add(len)
            .and_then(|end| data.get(start..end))
            .ok_or_else(truncated)?;

        return Ok(String::from_utf8_lossy(raw)
            .trim_end_matches('\0')
            .to_string());
    }

    Err(SourceError::Metadata("no ImageDescription tag".to_string()))
}
