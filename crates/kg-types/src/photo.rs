use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Number of hash bytes kept in a photo key.
pub const PHOTO_KEY_BYTES: usize = 8;

/// URL prefix under which photos are served; stored in `image_url` and
/// `profile_pic` columns.
pub const PHOTO_URL_PREFIX: &str = "api/photo/";

/// Object-store key of an uploaded photo.
///
/// Derived from the client filename, the file contents and the upload
/// instant. Re-uploading a file with the same name yields a fresh key, and two
/// keys only coincide when all three match, in which case the stored bytes are
/// identical anyway. Always `2 * PHOTO_KEY_BYTES`
/// lowercase hex characters, which also keeps it safe as a path component.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PhotoKey(String);

impl PhotoKey {
    pub fn derive(filename: &str, data: &[u8], uploaded_at: DateTime<Utc>) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&(filename.len() as u64).to_le_bytes());
        hasher.update(filename.as_bytes());
        hasher.update(blake3::hash(data).as_bytes());
        hasher.update(uploaded_at.format("%Y-%m-%d_%H-%M-%S%.6f").to_string().as_bytes());
        let hash = hasher.finalize();
        Self(hex::encode(&hash.as_bytes()[..PHOTO_KEY_BYTES]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Reference stored alongside the owning row, e.g. `api/photo/0a1b...`.
    pub fn url(&self) -> String {
        format!("{PHOTO_URL_PREFIX}{}", self.0)
    }
}

impl fmt::Debug for PhotoKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PhotoKey({})", self.0)
    }
}

impl fmt::Display for PhotoKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for PhotoKey {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let well_formed = s.len() == PHOTO_KEY_BYTES * 2
            && s.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        if !well_formed {
            return Err(TypeError::InvalidPhotoKey(s.to_string()));
        }
        Ok(Self(s.to_string()))
    }
}

impl TryFrom<String> for PhotoKey {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PhotoKey> for String {
    fn from(key: PhotoKey) -> Self {
        key.0
    }
}
