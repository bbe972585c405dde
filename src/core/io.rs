use anyhow::{Context, Result, bail};
use flate2::read::MultiGzDecoder;
use memmap2::Mmap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

pub struct MmapSource {
    mmap: Mmap,
}

impl MmapSource {
    pub fn open(path: &Path) -> Result<Self> {
        let file =
            File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
        // SAFETY: read-only file mapping.
        let mmap = unsafe { Mmap::map(&file) }.with_context(|| "mmap failed")?;
        Ok(Self { mmap })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.mmap
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum InputKind {
    Xlsx,
    Delimited { delimiter: u8, gzip: bool },
}

/// Whole-file contents, mapped when the file is stored uncompressed.
pub enum InputBytes {
    Mapped(MmapSource),
    Owned(Vec<u8>),
}

impl InputBytes {
    pub fn open(path: &Path, kind: InputKind) -> Result<Self> {
        match kind {
            InputKind::Delimited { gzip: true, .. } => {
                let mut reader = open_gzip_reader(path)?;
                let mut buf = Vec::new();
                reader
                    .read_to_end(&mut buf)
                    .with_context(|| format!("gzip decompression error in {}", path.display()))?;
                Ok(InputBytes::Owned(buf))
            }
            _ => {
                // Zero-length files cannot be mapped on every platform.
                let len = std::fs::metadata(path)
                    .with_context(|| format!("failed to stat {}", path.display()))?
                    .len();
                if len == 0 {
                    return Ok(InputBytes::Owned(Vec::new()));
                }
                Ok(InputBytes::Mapped(MmapSource::open(path)?))
            }
        }
    }

    pub fn as_slice(&self) -> &[u8] {
        match self {
            InputBytes::Mapped(source) => source.bytes(),
            InputBytes::Owned(buf) => buf,
        }
    }
}

const ZIP_MAGIC: [u8; 4] = [b'P', b'K', 0x03, 0x04];
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
const OLE_MAGIC: [u8; 4] = [0xd0, 0xcf, 0x11, 0xe0];

pub fn detect_input_kind(path: &Path) -> Result<InputKind> {
    let mut file =
        File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let mut magic = [0u8; 4];
    let n = read_up_to(&mut file, &mut magic).with_context(|| "failed to read magic bytes")?;
    let magic = &magic[..n];

    if magic.starts_with(&ZIP_MAGIC) {
        return Ok(InputKind::Xlsx);
    }
    if magic.starts_with(&OLE_MAGIC) {
        bail!(
            "{} is a legacy .xls workbook; save it as .xlsx",
            path.display()
        );
    }

    let mut ext = lower_ext(path);
    let gzip = magic.starts_with(&GZIP_MAGIC) || ext.as_deref() == Some("gz");
    if ext.as_deref() == Some("gz") {
        ext = path.file_stem().map(Path::new).and_then(lower_ext);
    }
    match ext.as_deref() {
        Some("xlsx") | Some("xlsm") if !gzip => {
            bail!("{} is not a valid xlsx workbook", path.display())
        }
        Some("csv") => Ok(InputKind::Delimited {
            delimiter: b',',
            gzip,
        }),
        _ => Ok(InputKind::Delimited {
            delimiter: b'\t',
            gzip,
        }),
    }
}

fn lower_ext(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_ascii_lowercase())
}

fn read_up_to(file: &mut File, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = file.read(&mut buf[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

pub fn open_gzip_reader(path: &Path) -> Result<Box<dyn Read>> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    Ok(Box::new(MultiGzDecoder::new(BufReader::new(file))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::Write;
    use std::path::PathBuf;

    fn scratch(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("ani_heatmap_io_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir.join(name)
    }

    #[test]
    fn test_detect_by_magic_and_extension() {
        let zip_path = scratch("looks_like.bin");
        std::fs::write(&zip_path, b"PK\x03\x04rest").unwrap();
        assert_eq!(detect_input_kind(&zip_path).unwrap(), InputKind::Xlsx);

        let csv = scratch("m.csv");
        std::fs::write(&csv, b",a\nx,1\n").unwrap();
        assert_eq!(
            detect_input_kind(&csv).unwrap(),
            InputKind::Delimited {
                delimiter: b',',
                gzip: false
            }
        );

        let tsv = scratch("m.tab");
        std::fs::write(&tsv, b"\ta\nx\t1\n").unwrap();
        assert_eq!(
            detect_input_kind(&tsv).unwrap(),
            InputKind::Delimited {
                delimiter: b'\t',
                gzip: false
            }
        );
    }

    #[test]
    fn test_gzip_csv_roundtrip() {
        let path = scratch("m.csv.gz");
        let mut enc = GzEncoder::new(Vec::new(), Compression::default());
        enc.write_all(b",a\nx,99.5\n").unwrap();
        std::fs::write(&path, enc.finish().unwrap()).unwrap();

        let kind = detect_input_kind(&path).unwrap();
        assert_eq!(
            kind,
            InputKind::Delimited {
                delimiter: b',',
                gzip: true
            }
        );
        let bytes = InputBytes::open(&path, kind).unwrap();
        assert_eq!(bytes.as_slice(), b",a\nx,99.5\n");
    }

    #[test]
    fn test_broken_xlsx_and_legacy_xls_rejected() {
        let fake = scratch("fake.xlsx");
        std::fs::write(&fake, b"not a zip").unwrap();
        assert!(detect_input_kind(&fake).is_err());

        let xls = scratch("old.xls");
        std::fs::write(&xls, [0xd0, 0xcf, 0x11, 0xe0, 0, 0]).unwrap();
        let err = detect_input_kind(&xls).unwrap_err().to_string();
        assert!(err.contains("legacy"));
    }

    #[test]
    fn test_missing_file() {
        assert!(detect_input_kind(Path::new("/nonexistent/ani.xlsx")).is_err());
    }
}
