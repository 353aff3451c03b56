//! Image geometry extraction.
//!
//! Only the fixed 348-byte NIfTI-1 header is read; voxel data is never touched.
//! `.nii.gz` files are streamed through a gzip decoder until the header is complete.

use flate2::read::GzDecoder;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use crate::error::ImageError;

const HEADER_SIZE: usize = 348;
const DIM_OFFSET: usize = 40;
const PIXDIM_OFFSET: usize = 76;
const MAGIC_OFFSET: usize = 344;

/// Array shape and voxel spacing of an image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageGeometry {
    /// Size along each axis (x, y, z, t, ...).
    pub shape: Vec<usize>,
    /// Spacing along each axis, millimetres for space and seconds for time.
    pub zooms: Vec<f64>,
}

impl ImageGeometry {
    pub fn new(shape: Vec<usize>, zooms: Vec<f64>) -> Self {
        Self { shape, zooms }
    }

    /// Size of axis `axis` (0-based); `None` past the last axis.
    pub fn dim(&self, axis: usize) -> Option<usize> {
        self.shape.get(axis).copied()
    }

    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    /// Number of volumes: the fourth axis, or 1 for a 3-D image.
    pub fn volumes(&self) -> usize {
        self.dim(3).unwrap_or(1)
    }
}

/// Source of image geometry for a scan path.
pub trait ImageReader {
    fn read(&self, path: &Path) -> Result<ImageGeometry, ImageError>;
}

/// Reads geometry from NIfTI-1 headers on disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct NiftiReader;

impl NiftiReader {
    pub fn new() -> Self {
        Self
    }

    fn read_header(path: &Path) -> Result<[u8; HEADER_SIZE], ImageError> {
        let file = File::open(path).map_err(|source| ImageError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let mut reader: Box<dyn Read> = if path.to_string_lossy().ends_with(".gz") {
            Box::new(GzDecoder::new(BufReader::new(file)))
        } else {
            Box::new(BufReader::new(file))
        };
        let mut header = [0u8; HEADER_SIZE];
        reader
            .read_exact(&mut header)
            .map_err(|e| ImageError::InvalidHeader {
                path: path.to_path_buf(),
                message: format!("could not read {HEADER_SIZE} header bytes: {e}"),
            })?;
        Ok(header)
    }
}

fn field<const N: usize>(header: &[u8], offset: usize) -> [u8; N] {
    let mut bytes = [0u8; N];
    bytes.copy_from_slice(&header[offset..offset + N]);
    bytes
}

/// Parse geometry from raw header bytes.
pub fn parse_nifti_header(path: &Path, header: &[u8]) -> Result<ImageGeometry, ImageError> {
    if header.len() < HEADER_SIZE {
        return Err(ImageError::InvalidHeader {
            path: path.to_path_buf(),
            message: format!("header is {} bytes, expected {HEADER_SIZE}", header.len()),
        });
    }

    let sizeof_hdr: [u8; 4] = field(header, 0);
    let little_endian = if i32::from_le_bytes(sizeof_hdr) == HEADER_SIZE as i32 {
        true
    } else if i32::from_be_bytes(sizeof_hdr) == HEADER_SIZE as i32 {
        false
    } else {
        return Err(ImageError::NotNifti {
            path: path.to_path_buf(),
        });
    };

    let magic = &header[MAGIC_OFFSET..MAGIC_OFFSET + 4];
    if magic != b"n+1\0" && magic != b"ni1\0" {
        return Err(ImageError::NotNifti {
            path: path.to_path_buf(),
        });
    }

    let read_i16 = |offset: usize| {
        let bytes: [u8; 2] = field(header, offset);
        if little_endian {
            i16::from_le_bytes(bytes)
        } else {
            i16::from_be_bytes(bytes)
        }
    };
    let read_f32 = |offset: usize| {
        let bytes: [u8; 4] = field(header, offset);
        if little_endian {
            f32::from_le_bytes(bytes)
        } else {
            f32::from_be_bytes(bytes)
        }
    };

    let ndim = read_i16(DIM_OFFSET);
    if !(1..=7).contains(&ndim) {
        return Err(ImageError::InvalidHeader {
            path: path.to_path_buf(),
            message: format!("dim[0] = {ndim} is outside 1..=7"),
        });
    }

    let mut shape = Vec::with_capacity(ndim as usize);
    let mut zooms = Vec::with_capacity(ndim as usize);
    for axis in 1..=ndim as usize {
        let size = read_i16(DIM_OFFSET + axis * 2);
        if size < 1 {
            return Err(ImageError::InvalidHeader {
                path: path.to_path_buf(),
                message: format!("dim[{axis}] = {size} is not positive"),
            });
        }
        shape.push(size as usize);
        // f32 spacing widened and trimmed to micrometre precision.
        let zoom = f64::from(read_f32(PIXDIM_OFFSET + axis * 4));
        zooms.push((zoom * 1e6).round() / 1e6);
    }

    Ok(ImageGeometry { shape, zooms })
}

impl ImageReader for NiftiReader {
    fn read(&self, path: &Path) -> Result<ImageGeometry, ImageError> {
        let header = Self::read_header(path)?;
        let geometry = parse_nifti_header(path, &header)?;
        tracing::trace!(path = %path.display(), shape = ?geometry.shape, "Read image header");
        Ok(geometry)
    }
}

/// In-memory geometry keyed by path, for callers without image files.
#[derive(Debug, Clone, Default)]
pub struct FixedGeometryReader {
    geometries: HashMap<PathBuf, ImageGeometry>,
    fallback: Option<ImageGeometry>,
}

impl FixedGeometryReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the geometry returned for `path`.
    pub fn with(mut self, path: impl Into<PathBuf>, geometry: ImageGeometry) -> Self {
        self.geometries.insert(path.into(), geometry);
        self
    }

    /// Geometry returned for any path that was not registered.
    pub fn with_fallback(mut self, geometry: ImageGeometry) -> Self {
        self.fallback = Some(geometry);
        self
    }
}

impl ImageReader for FixedGeometryReader {
    fn read(&self, path: &Path) -> Result<ImageGeometry, ImageError> {
        self.geometries
            .get(path)
            .or(self.fallback.as_ref())
            .cloned()
            .ok_or_else(|| ImageError::Unknown {
                path: path.to_path_buf(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::Write;

    fn header(shape: &[i16], zooms: &[f32], big_endian: bool) -> Vec<u8> {
        let mut bytes = vec![0u8; HEADER_SIZE];
        let put_i16 = |bytes: &mut Vec<u8>, offset: usize, v: i16| {
            let b = if big_endian { v.to_be_bytes() } else { v.to_le_bytes() };
            bytes[offset..offset + 2].copy_from_slice(&b);
        };
        let size = if big_endian {
            348i32.to_be_bytes()
        } else {
            348i32.to_le_bytes()
        };
        bytes[0..4].copy_from_slice(&size);
        put_i16(&mut bytes, DIM_OFFSET, shape.len() as i16);
        for (i, s) in shape.iter().enumerate() {
            put_i16(&mut bytes, DIM_OFFSET + (i + 1) * 2, *s);
        }
        for (i, z) in zooms.iter().enumerate() {
            let b = if big_endian { z.to_be_bytes() } else { z.to_le_bytes() };
            let offset = PIXDIM_OFFSET + (i + 1) * 4;
            bytes[offset..offset + 4].copy_from_slice(&b);
        }
        bytes[MAGIC_OFFSET..MAGIC_OFFSET + 4].copy_from_slice(b"n+1\0");
        bytes
    }

    #[test]
    fn test_parse_little_endian() {
        let bytes = header(&[64, 64, 30, 100], &[3.0, 3.0, 4.0, 2.0], false);
        let geometry = parse_nifti_header(Path::new("x.nii"), &bytes).unwrap();
        assert_eq!(geometry.shape, vec![64, 64, 30, 100]);
        assert_eq!(geometry.zooms, vec![3.0, 3.0, 4.0, 2.0]);
        assert_eq!(geometry.volumes(), 100);
    }

    #[test]
    fn test_parse_big_endian() {
        let bytes = header(&[256, 256, 176], &[1.0, 1.0, 1.2], true);
        let geometry = parse_nifti_header(Path::new("x.nii"), &bytes).unwrap();
        assert_eq!(geometry.shape, vec![256, 256, 176]);
        assert_eq!(geometry.zooms[2], 1.2);
        assert_eq!(geometry.volumes(), 1);
    }

    #[test]
    fn test_parse_rejects_bad_sizeof_hdr() {
        let mut bytes = header(&[2, 2, 2], &[1.0, 1.0, 1.0], false);
        bytes[0..4].copy_from_slice(&540i32.to_le_bytes());
        let result = parse_nifti_header(Path::new("x.nii"), &bytes);
        assert!(matches!(result, Err(ImageError::NotNifti { .. })));
    }

    #[test]
    fn test_parse_rejects_bad_ndim() {
        let mut bytes = header(&[2, 2, 2], &[1.0, 1.0, 1.0], false);
        bytes[DIM_OFFSET..DIM_OFFSET + 2].copy_from_slice(&0i16.to_le_bytes());
        let result = parse_nifti_header(Path::new("x.nii"), &bytes);
        assert!(matches!(result, Err(ImageError::InvalidHeader { .. })));
    }

    #[test]
    fn test_read_plain_and_gzip_files() {
        let dir = tempfile::tempdir().unwrap();
        let bytes = header(&[96, 96, 60, 64], &[2.0, 2.0, 2.0, 3.5], false);

        let plain = dir.path().join("sub-01_dwi.nii");
        std::fs::write(&plain, &bytes).unwrap();

        let gz = dir.path().join("sub-01_bold.nii.gz");
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&bytes).unwrap();
        std::fs::write(&gz, encoder.finish().unwrap()).unwrap();

        let reader = NiftiReader::new();
        let a = reader.read(&plain).unwrap();
        let b = reader.read(&gz).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.dim(3), Some(64));
    }

    #[test]
    fn test_read_missing_file() {
        let result = NiftiReader::new().read(Path::new("/nonexistent/sub-01_T1w.nii.gz"));
        assert!(matches!(result, Err(ImageError::Open { .. })));
    }

    #[test]
    fn test_fixed_reader() {
        let geometry = ImageGeometry::new(vec![64, 64, 30], vec![3.0, 3.0, 3.0]);
        let reader = FixedGeometryReader::new().with("a.nii", geometry.clone());
        assert_eq!(reader.read(Path::new("a.nii")).unwrap(), geometry);
        assert!(matches!(
            reader.read(Path::new("b.nii")),
            Err(ImageError::Unknown { .. })
        ));

        let reader = reader.with_fallback(ImageGeometry::new(vec![1, 1, 1], vec![1.0; 3]));
        assert_eq!(reader.read(Path::new("b.nii")).unwrap().shape, vec![1, 1, 1]);
    }
}
