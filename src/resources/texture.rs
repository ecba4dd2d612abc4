//! LDR texture loading

use super::{ResourceError, ResourceResult};
use image::{DynamicImage, GenericImageView};
use std::path::Path;

/// Loaded RGBA8 texture data
#[derive(Debug, Clone)]
pub struct TextureData {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
    pub name: String,
}

impl TextureData {
    /// Load texture from file
    pub fn from_file<P: AsRef<Path>>(path: P) -> ResourceResult<Self> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string();

        let bytes = std::fs::read(path).map_err(|source| ResourceError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let texture = Self::from_bytes(&bytes, &name)?;
        log::info!(
            "Loaded texture {} ({}x{})",
            path.display(),
            texture.width,
            texture.height
        );
        Ok(texture)
    }

    /// Load texture from encoded bytes (PNG, JPEG)
    pub fn from_bytes(bytes: &[u8], name: &str) -> ResourceResult<Self> {
        let img = image::load_from_memory(bytes)?;
        Self::from_image(img, name)
    }

    fn from_image(img: DynamicImage, name: &str) -> ResourceResult<Self> {
        let (width, height) = img.dimensions();
        if width == 0 || height == 0 {
            return Err(ResourceError::EmptyImage);
        }

        Ok(Self {
            width,
            height,
            data: img.to_rgba8().into_raw(),
            name: name.to_string(),
        })
    }

    /// Resample to a new size with a triangle filter
    pub fn resized(&self, width: u32, height: u32) -> TextureData {
        let Some(img) = image::RgbaImage::from_raw(self.width, self.height, self.data.clone())
        else {
            return self.clone();
        };
        let resized = image::imageops::resize(
            &img,
            width.max(1),
            height.max(1),
            image::imageops::FilterType::Triangle,
        );
        TextureData {
            width: resized.width(),
            height: resized.height(),
            data: resized.into_raw(),
            name: self.name.clone(),
        }
    }

    /// Number of levels in a full mip chain
    pub fn mip_level_count(&self) -> u32 {
        mip_level_count(self.width.max(self.height))
    }

    /// Full mip chain, level 0 first, each level 2x2 box filtered from the previous
    pub fn mip_chain(&self) -> Vec<TextureData> {
        let mut levels = vec![self.clone()];
        while let Some(prev) = levels.last() {
            if prev.width == 1 && prev.height == 1 {
                break;
            }
            let next = prev.downsample();
            levels.push(next);
        }
        levels
    }

    fn downsample(&self) -> TextureData {
        let width = (self.width / 2).max(1);
        let height = (self.height / 2).max(1);
        let mut data = Vec::with_capacity((width * height * 4) as usize);

        for y in 0..height {
            for x in 0..width {
                let mut sum = [0u32; 4];
                for (sx, sy) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
                    let px = (x * 2 + sx).min(self.width - 1);
                    let py = (y * 2 + sy).min(self.height - 1);
                    let offset = ((py * self.width + px) * 4) as usize;
                    for (channel, total) in sum.iter_mut().enumerate() {
                        *total += self.data[offset + channel] as u32;
                    }
                }
                data.extend(sum.iter().map(|total| ((total + 2) / 4) as u8));
            }
        }

        TextureData {
            width,
            height,
            data,
            name: self.name.clone(),
        }
    }
}

/// `floor(log2(size)) + 1`
pub fn mip_level_count(size: u32) -> u32 {
    32 - size.max(1).leading_zeros()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid_color(color: [u8; 4], size: u32, name: &str) -> TextureData {
        TextureData {
            width: size,
            height: size,
            data: color.repeat((size * size) as usize),
            name: name.to_string(),
        }
    }

    #[test]
    fn mip_count_matches_log2() {
        assert_eq!(mip_level_count(1), 1);
        assert_eq!(mip_level_count(2), 2);
        assert_eq!(mip_level_count(512), 10);
        assert_eq!(mip_level_count(600), 10);
        assert_eq!(mip_level_count(0), 1);
    }

    #[test]
    fn mip_chain_averages_down_to_one_pixel() {
        let mut texture = solid_color([0, 0, 0, 255], 4, "test");
        // Top-left 2x2 block white
        for (x, y) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
            let offset = (y * 4 + x) * 4;
            texture.data[offset..offset + 3].copy_from_slice(&[255, 255, 255]);
        }

        let chain = texture.mip_chain();
        assert_eq!(chain.len() as u32, texture.mip_level_count());
        assert_eq!((chain[1].width, chain[1].height), (2, 2));
        assert_eq!(&chain[1].data[0..4], &[255, 255, 255, 255]);
        assert_eq!(&chain[1].data[4..8], &[0, 0, 0, 255]);
        assert_eq!((chain[2].width, chain[2].height), (1, 1));
        assert_eq!(chain[2].data[0], 64);
    }

    #[test]
    fn non_square_chain_ends_at_one_by_one() {
        let texture = solid_color([10, 20, 30, 40], 1, "bar");
        let wide = TextureData {
            width: 8,
            height: 2,
            data: texture.data.repeat(16),
            name: "wide".into(),
        };
        let chain = wide.mip_chain();
        let sizes: Vec<_> = chain.iter().map(|t| (t.width, t.height)).collect();
        assert_eq!(sizes, vec![(8, 2), (4, 1), (2, 1), (1, 1)]);
        assert_eq!(&chain[3].data, &[10, 20, 30, 40]);
    }

    #[test]
    fn resize_keeps_solid_color() {
        let texture = solid_color([200, 100, 50, 255], 16, "big");
        let small = texture.resized(4, 4);
        assert_eq!((small.width, small.height), (4, 4));
        assert_eq!(small.data.len(), 4 * 4 * 4);
        assert!(small.data.chunks(4).all(|p| p == [200, 100, 50, 255]));
        assert_eq!(small.name, "big");
    }

    #[test]
    fn decodes_png_bytes() {
        let mut bytes = Vec::new();
        let img = image::RgbaImage::from_pixel(2, 2, image::Rgba([9, 8, 7, 255]));
        DynamicImage::ImageRgba8(img)
            .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageOutputFormat::Png)
            .unwrap();
        let texture = TextureData::from_bytes(&bytes, "png").unwrap();
        assert_eq!((texture.width, texture.height), (2, 2));
        assert_eq!(&texture.data[0..4], &[9, 8, 7, 255]);
    }
}
