use std::{
    fs::File,
    io::{BufReader, Read},
    path::Path,
};

use anyhow::Context as _;

use crate::foundation::error::PackResult;

/// File the video digest is written to, inside the output directory.
pub const MD5_FILE: &str = "md5.txt";

/// Lowercase hex MD5 of `path`, or `None` when it is missing, not a file or empty.
pub fn file_md5_hex(path: &Path) -> PackResult<Option<String>> {
    let Ok(meta) = std::fs::metadata(path) else {
        return Ok(None);
    };
    if !meta.is_file() || meta.len() == 0 {
        return Ok(None);
    }

    let mut reader = BufReader::new(
        File::open(path).with_context(|| format!("open '{}' for md5", path.display()))?,
    );
    let mut ctx = md5::Context::new();
    let mut buf = [0u8; 4096];
    loop {
        let n = reader
            .read(&mut buf)
            .with_context(|| format!("read '{}' for md5", path.display()))?;
        if n == 0 {
            break;
        }
        ctx.consume(&buf[..n]);
    }
    Ok(Some(format!("{:x}", ctx.compute())))
}

/// Digest `video` and store the hex string in `<out_dir>/md5.txt`.
pub fn write_md5_file(video: &Path, out_dir: &Path) -> PackResult<Option<String>> {
    let Some(hex) = file_md5_hex(video)? else {
        return Ok(None);
    };
    let dest = out_dir.join(MD5_FILE);
    std::fs::write(&dest, &hex).with_context(|| format!("write '{}'", dest.display()))?;
    tracing::info!("md5={hex}");
    Ok(Some(hex))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_digest() {
        let dir = tempfile::tempdir().unwrap();
        let f = dir.path().join("v.mp4");
        std::fs::write(&f, b"abc").unwrap();
        assert_eq!(
            file_md5_hex(&f).unwrap().as_deref(),
            Some("900150983cd24fb0d6963f7d28e17f72")
        );
    }

    #[test]
    fn empty_or_missing_file_has_no_digest() {
        let dir = tempfile::tempdir().unwrap();
        let f = dir.path().join("empty.mp4");
        std::fs::write(&f, b"").unwrap();
        assert_eq!(file_md5_hex(&f).unwrap(), None);
        assert_eq!(file_md5_hex(&dir.path().join("nope")).unwrap(), None);
        assert_eq!(write_md5_file(&f, dir.path()).unwrap(), None);
        assert!(!dir.path().join(MD5_FILE).exists());
    }

    #[test]
    fn digest_file_is_written() {
        let dir = tempfile::tempdir().unwrap();
        let f = dir.path().join("v.mp4");
        std::fs::write(&f, vec![7u8; 10_000]).unwrap();
        let hex = write_md5_file(&f, dir.path()).unwrap().unwrap();
        assert_eq!(std::fs::read_to_string(dir.path().join(MD5_FILE)).unwrap(), hex);
        assert_eq!(hex.len(), 32);
    }
}
