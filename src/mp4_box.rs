//! Length-prefixed, four-character-tagged boxes as used by MP4 containers.
//!
//! A box is an 8-byte header (big-endian `u32` total length including the header, then four raw
//! type bytes) followed by its payload. Only the flat top-level sequence of boxes is walked;
//! nested boxes, 64-bit `largesize` boxes and size-to-end boxes are not interpreted.

use std::{
    fs::File,
    io::{BufReader, BufWriter, Cursor, ErrorKind, Read, Seek, SeekFrom, Write},
    path::{Path, PathBuf},
};

use anyhow::Context as _;

use crate::foundation::error::{PackError, PackResult};

/// Four raw type bytes of a box.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct BoxType(pub [u8; 4]);

impl BoxType {
    /// Box carrying the alpha-video metadata document.
    pub const VAPC: BoxType = BoxType(*b"vapc");

    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }
}

impl std::str::FromStr for BoxType {
    type Err = PackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes: [u8; 4] = s.as_bytes().try_into().map_err(|_| {
            PackError::validation(format!("box type must be exactly 4 bytes, got '{s}'"))
        })?;
        Ok(Self(bytes))
    }
}

impl std::fmt::Display for BoxType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for &b in &self.0 {
            if b.is_ascii_graphic() || b == b' ' {
                write!(f, "{}", b as char)?;
            } else {
                write!(f, "\\x{b:02x}")?;
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for BoxType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "BoxType(\"{self}\")")
    }
}

/// The 8-byte box header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BoxHeader {
    /// Total box length, header included.
    pub length: u32,
    pub box_type: BoxType,
}

impl BoxHeader {
    pub const SIZE: u64 = 8;

    /// Header for a payload of `payload_len` bytes.
    pub fn for_payload(payload_len: u64, box_type: BoxType) -> PackResult<Self> {
        let length = payload_len
            .checked_add(Self::SIZE)
            .and_then(|total| u32::try_from(total).ok())
            .ok_or(PackError::PayloadTooLarge { len: payload_len })?;
        Ok(Self { length, box_type })
    }

    pub fn encode(&self) -> [u8; 8] {
        let mut out = [0u8; 8];
        out[..4].copy_from_slice(&self.length.to_be_bytes());
        out[4..].copy_from_slice(self.box_type.as_bytes());
        out
    }

    pub fn decode(bytes: [u8; 8]) -> Self {
        Self {
            length: u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            box_type: BoxType([bytes[4], bytes[5], bytes[6], bytes[7]]),
        }
    }

    /// Payload length, or `None` when the declared length cannot even hold the header.
    pub fn payload_len(&self) -> Option<u64> {
        u64::from(self.length).checked_sub(Self::SIZE)
    }
}

/// Where a box sits inside a scanned stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BoxLocation {
    pub box_type: BoxType,
    /// Offset of the box header.
    pub box_offset: u64,
    /// Offset of the first payload byte.
    pub payload_offset: u64,
    pub payload_length: u64,
}

/// Outcome of a scan: `None` means not found (including malformed or truncated input).
pub type ScanResult = Option<BoxLocation>;

/// `header || payload` in memory.
pub fn wrap(payload: &[u8], box_type: BoxType) -> PackResult<Vec<u8>> {
    let header = BoxHeader::for_payload(payload.len() as u64, box_type)?;
    let mut out = Vec::with_capacity(payload.len() + BoxHeader::SIZE as usize);
    out.extend_from_slice(&header.encode());
    out.extend_from_slice(payload);
    Ok(out)
}

/// Stream `payload_len` bytes from `payload` into `out` behind a box header.
pub fn write_box<R: Read, W: Write>(
    payload: &mut R,
    payload_len: u64,
    out: &mut W,
    box_type: BoxType,
) -> PackResult<()> {
    let header = BoxHeader::for_payload(payload_len, box_type)?;
    out.write_all(&header.encode())?;
    let copied = std::io::copy(&mut payload.take(payload_len), out)?;
    if copied != payload_len {
        return Err(PackError::format(format!(
            "payload ended after {copied} of {payload_len} declared bytes"
        )));
    }
    out.flush()?;
    Ok(())
}

/// Box the contents of `payload_path` into a standalone file at `out_path`.
pub fn write_box_file(
    payload_path: &Path,
    out_path: &Path,
    box_type: BoxType,
) -> PackResult<PathBuf> {
    let payload_len = std::fs::metadata(payload_path)
        .with_context(|| format!("stat payload '{}'", payload_path.display()))?
        .len();
    if let Some(parent) = out_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }

    let mut reader = BufReader::new(
        File::open(payload_path)
            .with_context(|| format!("open payload '{}'", payload_path.display()))?,
    );
    let mut writer = BufWriter::new(
        File::create(out_path)
            .with_context(|| format!("create box file '{}'", out_path.display()))?,
    );
    write_box(&mut reader, payload_len, &mut writer, box_type)?;

    tracing::debug!(
        "wrote {box_type} box ({} bytes) to {}",
        payload_len + BoxHeader::SIZE,
        out_path.display()
    );
    Ok(out_path.to_path_buf())
}

/// Walk the top-level boxes of `stream` from offset 0 looking for `box_type`.
///
/// After each non-matching header the scanner skips `length - 8` bytes relative to its current
/// position, i.e. to the end of that box. Short headers, lengths below 8 and boxes running past
/// the end of the stream all end the scan with `None`. Only genuine I/O failures are errors.
pub fn find_box<R: Read + Seek>(stream: &mut R, box_type: BoxType) -> PackResult<ScanResult> {
    let end = stream.seek(SeekFrom::End(0))?;
    let mut pos = stream.seek(SeekFrom::Start(0))?;

    loop {
        if end.saturating_sub(pos) < BoxHeader::SIZE {
            return Ok(None);
        }

        let mut raw = [0u8; 8];
        match stream.read_exact(&mut raw) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(e.into()),
        }
        let header = BoxHeader::decode(raw);

        let Some(payload_length) = header.payload_len() else {
            tracing::debug!(
                "malformed box header at {pos}: length {} < 8",
                header.length
            );
            return Ok(None);
        };
        let payload_offset = pos + BoxHeader::SIZE;
        if payload_length > end - payload_offset {
            tracing::debug!(
                "box '{}' at {pos} declares {} bytes but only {} remain",
                header.box_type,
                header.length,
                end - pos
            );
            return Ok(None);
        }

        if header.box_type == box_type {
            return Ok(Some(BoxLocation {
                box_type,
                box_offset: pos,
                payload_offset,
                payload_length,
            }));
        }

        pos = stream.seek(SeekFrom::Current(payload_length as i64))?;
    }
}

/// [`find_box`] over an in-memory buffer.
pub fn find_box_in(bytes: &[u8], box_type: BoxType) -> ScanResult {
    find_box(&mut Cursor::new(bytes), box_type).ok().flatten()
}

/// Read the payload bytes a previous scan located.
pub fn read_payload<R: Read + Seek>(stream: &mut R, location: &BoxLocation) -> PackResult<Vec<u8>> {
    let len = usize::try_from(location.payload_length)
        .map_err(|_| PackError::format("box payload does not fit in memory"))?;
    stream.seek(SeekFrom::Start(location.payload_offset))?;
    let mut buf = vec![0u8; len];
    stream.read_exact(&mut buf)?;
    Ok(buf)
}

/// Find `box_type` in `container` and write its payload to `out_path`.
///
/// Returns the payload, or `None` (writing nothing) when the box is absent.
pub fn extract_box_file(
    container: &Path,
    out_path: &Path,
    box_type: BoxType,
) -> PackResult<Option<Vec<u8>>> {
    let mut reader = BufReader::new(
        File::open(container)
            .with_context(|| format!("open container '{}'", container.display()))?,
    );
    let Some(location) = find_box(&mut reader, box_type)? else {
        tracing::info!("{box_type} box not found in {}", container.display());
        return Ok(None);
    };
    let payload = read_payload(&mut reader, &location)?;

    if let Some(parent) = out_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    std::fs::write(out_path, &payload)
        .with_context(|| format!("write payload '{}'", out_path.display()))?;
    Ok(Some(payload))
}
