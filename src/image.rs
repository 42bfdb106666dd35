use crate::model::ProfilePicture;
use std::path::Path;

pub const MAX_IMAGE_BYTES: u64 = 2 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageMime {
    Png,
    Jpeg,
    Gif,
}

impl ImageMime {
    pub fn as_str(self) -> &'static str {
        match self {
            ImageMime::Png => "image/png",
            ImageMime::Jpeg => "image/jpeg",
            ImageMime::Gif => "image/gif",
        }
    }

    /// Extension-derived; no content sniffing.
    pub fn from_file_name(name: &str) -> Option<Self> {
        let name = name.to_ascii_lowercase();
        if name.ends_with(".png") {
            Some(ImageMime::Png)
        } else if name.ends_with(".jpg") || name.ends_with(".jpeg") {
            Some(ImageMime::Jpeg)
        } else if name.ends_with(".gif") {
            Some(ImageMime::Gif)
        } else {
            None
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("Selected image is {:.2} MB. Please choose a file under 2.00 MB.", megabytes(.0))]
    TooLarge(u64),
    #[error("Allowed file types: PNG, JPG, JPEG, GIF.")]
    Unsupported,
    #[error("Could not read the selected file. Please try another image.")]
    Unreadable(#[source] std::io::Error),
}

fn megabytes(bytes: &u64) -> f64 {
    *bytes as f64 / (1024.0 * 1024.0)
}

/// Size is checked from metadata before the extension and before reading.
pub fn load_profile_picture(path: &Path) -> Result<ProfilePicture, ImageError> {
    let meta = std::fs::metadata(path).map_err(ImageError::Unreadable)?;
    if meta.len() > MAX_IMAGE_BYTES {
        return Err(ImageError::TooLarge(meta.len()));
    }

    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    let Some(mime) = ImageMime::from_file_name(file_name) else {
        return Err(ImageError::Unsupported);
    };

    let bytes = std::fs::read(path).map_err(ImageError::Unreadable)?;
    // The file may have grown between stat and read.
    if bytes.len() as u64 > MAX_IMAGE_BYTES {
        return Err(ImageError::TooLarge(bytes.len() as u64));
    }

    Ok(ProfilePicture {
        bytes,
        mime: Some(mime.as_str().to_string()),
    })
}
