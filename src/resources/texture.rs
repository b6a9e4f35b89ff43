//! Texture data and material fallbacks.
//!
//! Decoded images arrive from the asset layer as RGBA8. When a material
//! references a missing texture, the renderer binds a fixed fallback instead
//! of leaving the slot empty:
//!
//! | Slot   | Fallback                                  |
//! |--------|-------------------------------------------|
//! | Albedo | 8×8 magenta/black checker ("missing")     |
//! | Normal | flat tangent-space normal `(0.5, 0.5, 1)` |
//! | Pbr    | roughness 0.5, metal 0, AO 1, height 0    |

use serde::{Deserialize, Serialize};
use slotmap::SlotMap;

use crate::scene::TextureHandle;

/// RGBA8 image in row-major order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl Image {
    /// Creates an image, returning `None` when `data` does not hold exactly
    /// `width * height` RGBA8 pixels.
    #[must_use]
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        (data.len() == (width as usize) * (height as usize) * 4).then_some(Self {
            width,
            height,
            data,
        })
    }

    #[must_use]
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let data = rgba
            .iter()
            .copied()
            .cycle()
            .take((width * height * 4) as usize)
            .collect();
        Self {
            width,
            height,
            data,
        }
    }

    /// The recognizable "missing texture" checkerboard.
    #[must_use]
    pub fn missing_albedo() -> Self {
        const SIZE: u32 = 8;
        let mut data = Vec::with_capacity((SIZE * SIZE * 4) as usize);
        for y in 0..SIZE {
            for x in 0..SIZE {
                let texel = if (x / 2 + y / 2) % 2 == 0 {
                    [255, 0, 255, 255]
                } else {
                    [0, 0, 0, 255]
                };
                data.extend_from_slice(&texel);
            }
        }
        Self {
            width: SIZE,
            height: SIZE,
            data,
        }
    }

    #[must_use]
    pub fn flat_normal() -> Self {
        Self::solid(1, 1, [128, 128, 255, 255])
    }

    /// Packed material parameters: R = roughness, G = metalness,
    /// B = ambient occlusion, A = height.
    #[must_use]
    pub fn neutral_pbr() -> Self {
        Self::solid(1, 1, [128, 0, 255, 0])
    }

    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = ((y * self.width + x) * 4) as usize;
        [
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ]
    }

    /// Downscales the image so neither side exceeds `max_dimension`.
    #[must_use]
    pub fn limited_to(&self, max_dimension: u32) -> std::borrow::Cow<'_, Self> {
        let largest = self.width.max(self.height);
        if largest <= max_dimension || max_dimension == 0 {
            return std::borrow::Cow::Borrowed(self);
        }
        let scale = max_dimension as f32 / largest as f32;
        let width = ((self.width as f32 * scale).round() as u32).max(1);
        let height = ((self.height as f32 * scale).round() as u32).max(1);

        let Some(source) = image::RgbaImage::from_raw(self.width, self.height, self.data.clone())
        else {
            return std::borrow::Cow::Borrowed(self);
        };
        let resized =
            image::imageops::resize(&source, width, height, image::imageops::FilterType::Triangle);
        std::borrow::Cow::Owned(Self {
            width,
            height,
            data: resized.into_raw(),
        })
    }

    /// Resamples to an exact size (cookie atlas layers).
    #[must_use]
    pub fn resized(&self, width: u32, height: u32) -> Self {
        if self.width == width && self.height == height {
            return self.clone();
        }
        match image::RgbaImage::from_raw(self.width, self.height, self.data.clone()) {
            Some(source) => image::imageops::resize(
                &source,
                width,
                height,
                image::imageops::FilterType::Triangle,
            )
            .into(),
            None => Self::solid(width, height, [255; 4]),
        }
    }
}

impl From<image::RgbaImage> for Image {
    fn from(img: image::RgbaImage) -> Self {
        Self {
            width: img.width(),
            height: img.height(),
            data: img.into_raw(),
        }
    }
}

// ============================================================================
// Fallback resolution
// ============================================================================

/// Which material texture a binding slot expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureSlot {
    Albedo,
    Normal,
    Pbr,
}

impl TextureSlot {
    #[must_use]
    pub fn fallback_image(self) -> Image {
        match self {
            Self::Albedo => Image::missing_albedo(),
            Self::Normal => Image::flat_normal(),
            Self::Pbr => Image::neutral_pbr(),
        }
    }
}

/// Outcome of resolving a (possibly absent) material texture reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureSource {
    Scene(TextureHandle),
    Fallback(TextureSlot),
}

/// Resolves a material texture reference against the scene's texture store.
///
/// Both an unset handle and a handle whose texture has been removed fall back
/// to the slot default.
#[must_use]
pub fn resolve_texture(
    textures: &SlotMap<TextureHandle, Image>,
    handle: Option<TextureHandle>,
    slot: TextureSlot,
) -> TextureSource {
    match handle {
        Some(h) if textures.contains_key(h) => TextureSource::Scene(h),
        _ => TextureSource::Fallback(slot),
    }
}

// ============================================================================
// Texture quality
// ============================================================================

/// Upload-time texture resolution cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextureQuality {
    Low,
    Medium,
    #[default]
    High,
}

impl TextureQuality {
    #[must_use]
    pub fn max_dimension(self) -> u32 {
        match self {
            Self::Low => 256,
            Self::Medium => 1024,
            Self::High => 4096,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_albedo_is_a_checker() {
        let img = Image::missing_albedo();
        assert_eq!(img.pixel(0, 0), [255, 0, 255, 255]);
        assert_eq!(img.pixel(2, 0), [0, 0, 0, 255]);
    }

    #[test]
    fn unset_and_stale_handles_fall_back() {
        let mut textures: SlotMap<TextureHandle, Image> = SlotMap::with_key();
        let live = textures.insert(Image::solid(1, 1, [1, 2, 3, 4]));
        let stale = textures.insert(Image::solid(1, 1, [0; 4]));
        textures.remove(stale);

        assert_eq!(
            resolve_texture(&textures, Some(live), TextureSlot::Albedo),
            TextureSource::Scene(live)
        );
        assert_eq!(
            resolve_texture(&textures, Some(stale), TextureSlot::Normal),
            TextureSource::Fallback(TextureSlot::Normal)
        );
        assert_eq!(
            resolve_texture(&textures, None, TextureSlot::Pbr),
            TextureSource::Fallback(TextureSlot::Pbr)
        );
    }

    #[test]
    fn quality_cap_downscales_large_images() {
        let img = Image::solid(512, 256, [10, 20, 30, 255]);
        let capped = img.limited_to(TextureQuality::Low.max_dimension());
        assert_eq!((capped.width, capped.height), (256, 128));
    }
}
