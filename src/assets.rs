//! Asset loading: decoded images for 2D textures and cubemap faces, and
//! WGSL shader sources read from disk.
//!
//! Every loader degrades instead of failing the frame loop: an unreadable
//! or undecodable file is logged and replaced with a placeholder, and a
//! missing shader file falls back to the source compiled into the binary.

use std::path::{Path, PathBuf};

use log::{error, warn};
use thiserror::Error;

/// Typed asset-loading failures, so callers can tell an unreadable file
/// from a bad image from a shader that failed validation.
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode image {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("shader {label} failed validation: {message}")]
    ShaderValidation { label: String, message: String },
}

/// Decoded RGBA8 pixels ready for GPU upload.
#[derive(Debug, Clone)]
pub struct ImageData {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl ImageData {
    /// Loads and decodes an image file, converting to RGBA8.
    pub fn from_file(path: &Path) -> Result<Self, AssetError> {
        let bytes = std::fs::read(path).map_err(|source| AssetError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let decoded = image::load_from_memory(&bytes).map_err(|source| AssetError::Decode {
            path: path.to_path_buf(),
            source,
        })?;
        let rgba = decoded.to_rgba8();
        let (width, height) = rgba.dimensions();
        Ok(Self {
            data: rgba.into_raw(),
            width,
            height,
        })
    }

    /// A solid-color image, used as the stand-in for anything that failed
    /// to load.
    pub fn solid_color(width: u32, height: u32, color: [u8; 4]) -> Self {
        let pixels = (width * height) as usize;
        let mut data = Vec::with_capacity(pixels * 4);
        for _ in 0..pixels {
            data.extend_from_slice(&color);
        }
        Self {
            data,
            width,
            height,
        }
    }
}

/// Neutral gray used wherever a texture could not be loaded.
pub const FALLBACK_COLOR: [u8; 4] = [128, 128, 128, 255];

/// Loads a 2D texture image, substituting a solid placeholder on failure.
pub fn load_image_or_fallback(path: &Path) -> ImageData {
    match ImageData::from_file(path) {
        Ok(image) => image,
        Err(err) => {
            error!("{err}; using placeholder texture");
            ImageData::solid_color(1, 1, FALLBACK_COLOR)
        }
    }
}

/// Loads the six cubemap faces in layer order.
///
/// All layers of a cube texture must share one size, so the first face that
/// decodes fixes the dimensions; any face that fails to load or does not
/// match is replaced with a solid placeholder of the right size.
pub fn load_cubemap_faces(paths: &[PathBuf; 6]) -> [ImageData; 6] {
    let loaded: Vec<Result<ImageData, AssetError>> =
        paths.iter().map(|path| ImageData::from_file(path)).collect();

    let (width, height) = loaded
        .iter()
        .flatten()
        .map(|image| (image.width, image.height))
        .next()
        .unwrap_or((1, 1));

    let mut faces = Vec::with_capacity(6);
    for (result, path) in loaded.into_iter().zip(paths) {
        match result {
            Ok(image) if image.width == width && image.height == height => faces.push(image),
            Ok(image) => {
                warn!(
                    "cubemap face {} is {}x{}, expected {}x{}; using placeholder",
                    path.display(),
                    image.width,
                    image.height,
                    width,
                    height
                );
                faces.push(ImageData::solid_color(width, height, FALLBACK_COLOR));
            }
            Err(err) => {
                error!("{err}; using placeholder cubemap face");
                faces.push(ImageData::solid_color(width, height, FALLBACK_COLOR));
            }
        }
    }

    faces
        .try_into()
        .unwrap_or_else(|_| unreachable!("exactly six faces are built above"))
}

/// Reads a WGSL shader source file, falling back to the embedded copy when
/// the file is missing or unreadable.
pub fn load_shader_source(path: &Path, embedded: &str) -> String {
    match std::fs::read_to_string(path) {
        Ok(source) => source,
        Err(err) => {
            warn!(
                "failed to read shader {}: {err}; using embedded source",
                path.display()
            );
            embedded.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn solid_color_fills_every_pixel() {
        let image = ImageData::solid_color(4, 2, [10, 20, 30, 255]);
        assert_eq!(image.data.len(), 4 * 2 * 4);
        assert!(image.data.chunks_exact(4).all(|px| px == [10, 20, 30, 255]));
    }

    #[test]
    fn missing_image_becomes_placeholder() {
        let image = load_image_or_fallback(Path::new("does/not/exist.png"));
        assert_eq!((image.width, image.height), (1, 1));
        assert_eq!(&image.data[..4], &FALLBACK_COLOR);
    }

    #[test]
    fn unreadable_image_reports_io_error() {
        let err = ImageData::from_file(Path::new("does/not/exist.png")).unwrap_err();
        assert!(matches!(err, AssetError::Io { .. }));
    }

    #[test]
    fn undecodable_image_reports_decode_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"not an image").unwrap();
        let err = ImageData::from_file(file.path()).unwrap_err();
        assert!(matches!(err, AssetError::Decode { .. }));
    }

    #[test]
    fn cubemap_faces_all_share_one_size() {
        let missing = std::array::from_fn(|i| PathBuf::from(format!("missing/face{i}.jpg")));
        let faces = load_cubemap_faces(&missing);
        assert!(faces
            .iter()
            .all(|face| face.width == 1 && face.height == 1));
    }

    #[test]
    fn shader_loader_prefers_the_file_and_falls_back_when_absent() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"// on-disk shader").unwrap();
        let from_disk = load_shader_source(file.path(), "// embedded");
        assert_eq!(from_disk, "// on-disk shader");

        let fallback = load_shader_source(Path::new("missing.wgsl"), "// embedded");
        assert_eq!(fallback, "// embedded");
    }
}
