//! Equirectangular HDR environment images

use super::{ResourceError, ResourceResult};
use glam::{Vec3, Vec4};
use image::codecs::hdr::HdrDecoder;
use image::Rgb;
use std::f32::consts::{PI, TAU};
use std::io::Cursor;
use std::path::Path;

/// Linear RGBA f32 image in latitude/longitude layout, row 0 at the zenith
#[derive(Debug, Clone)]
pub struct HdrImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<Vec4>,
}

impl HdrImage {
    /// Load a Radiance `.hdr` file
    pub fn load<P: AsRef<Path>>(path: P) -> ResourceResult<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| ResourceError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let image = Self::from_bytes(&bytes)?;
        log::info!(
            "Loaded HDR environment {} ({}x{})",
            path.display(),
            image.width,
            image.height
        );
        Ok(image)
    }

    /// Decode Radiance bytes at full float precision
    pub fn from_bytes(bytes: &[u8]) -> ResourceResult<Self> {
        // The generic loader hands back Rgb8 for .hdr, so go through the decoder
        let decoder = HdrDecoder::new(Cursor::new(bytes))?;
        let meta = decoder.metadata();
        let data = decoder
            .read_image_hdr()?
            .into_iter()
            .flat_map(|Rgb([r, g, b])| [r, g, b, 1.0])
            .collect();
        Self::from_rgba32f(meta.width, meta.height, data)
    }

    /// Build from tightly packed RGBA f32 data
    pub fn from_rgba32f(width: u32, height: u32, data: Vec<f32>) -> ResourceResult<Self> {
        if width == 0 || height == 0 || data.len() != (width * height * 4) as usize {
            return Err(ResourceError::EmptyImage);
        }
        let pixels = data
            .chunks_exact(4)
            .map(|p| Vec4::new(p[0], p[1], p[2], p[3]))
            .collect();
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Gradient sky with a bright sun, used when no environment file is given
    pub fn procedural_sky(width: u32, height: u32) -> Self {
        let width = width.max(2);
        let height = height.max(2);
        let sun_dir = Vec3::new(0.6, 0.45, -0.65).normalize();
        let zenith = Vec3::new(0.15, 0.3, 0.75);
        let horizon = Vec3::new(0.85, 0.9, 1.0);
        let ground = Vec3::new(0.25, 0.2, 0.15);

        let mut pixels = Vec::with_capacity((width * height) as usize);
        for y in 0..height {
            for x in 0..width {
                let u = (x as f32 + 0.5) / width as f32;
                let v = (y as f32 + 0.5) / height as f32;
                let dir = equirect_direction(u, v);

                let color = if dir.y >= 0.0 {
                    horizon.lerp(zenith, dir.y.powf(0.5))
                } else {
                    horizon.lerp(ground, (-dir.y).powf(0.35))
                };
                let sun = dir.dot(sun_dir).max(0.0).powf(512.0) * 40.0;
                pixels.push((color + Vec3::splat(sun)).extend(1.0));
            }
        }

        Self {
            width,
            height,
            pixels,
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> Vec4 {
        self.pixels[(y.min(self.height - 1) * self.width + x.min(self.width - 1)) as usize]
    }

    /// Nearest sample along a world direction
    pub fn sample_direction(&self, dir: Vec3) -> Vec4 {
        let (u, v) = equirect_uv(dir);
        let x = ((u * self.width as f32) as u32).min(self.width - 1);
        let y = ((v * self.height as f32) as u32).min(self.height - 1);
        self.pixel(x, y)
    }

    /// Resample to a new size with a triangle filter.
    ///
    /// `imageops` clamps float samples to [0, 1], so values are normalised by
    /// the peak channel first and scaled back afterwards.
    pub fn downscaled(&self, width: u32, height: u32) -> Self {
        let peak = self
            .pixels
            .iter()
            .map(|p| p.max_element())
            .fold(0.0f32, f32::max);
        let scale = if peak > 0.0 { peak } else { 1.0 };

        let data: Vec<f32> = self
            .pixels
            .iter()
            .flat_map(|p| (p.max(Vec4::ZERO) / scale).to_array())
            .collect();
        let Some(img) = image::Rgba32FImage::from_raw(self.width, self.height, data) else {
            return self.clone();
        };
        let resized = image::imageops::resize(
            &img,
            width.max(1),
            height.max(1),
            image::imageops::FilterType::Triangle,
        );
        Self {
            width: resized.width(),
            height: resized.height(),
            pixels: resized
                .pixels()
                .map(|p| Vec4::from_array(p.0) * scale)
                .collect(),
        }
    }

    /// Pixel data converted to half floats for a filterable GPU texture
    pub fn to_rgba16f(&self) -> Vec<half::f16> {
        self.pixels
            .iter()
            .flat_map(|p| p.to_array())
            .map(half::f16::from_f32)
            .collect()
    }
}

/// Direction to equirect texture coordinates, v = 0 at the zenith
pub fn equirect_uv(dir: Vec3) -> (f32, f32) {
    let d = dir.normalize_or_zero();
    let u = d.z.atan2(d.x) / TAU + 0.5;
    let v = 1.0 - (d.y.clamp(-1.0, 1.0).asin() / PI + 0.5);
    (u, v)
}

/// Inverse of [`equirect_uv`]
pub fn equirect_direction(u: f32, v: f32) -> Vec3 {
    let phi = (u - 0.5) * TAU;
    let theta = (0.5 - v) * PI;
    Vec3::new(theta.cos() * phi.cos(), theta.sin(), theta.cos() * phi.sin())
}

/// Largest size with the same aspect that fits within `max` on both axes
pub fn fit_to_limit(width: u32, height: u32, max: u32) -> (u32, u32) {
    if width <= max && height <= max {
        return (width, height);
    }
    let scale = (max as f64 / width as f64).min(max as f64 / height as f64);
    let fit = |side: u32| ((side as f64 * scale).round() as u32).clamp(1, max);
    (fit(width), fit(height))
}

/// GPU copy of an equirect image: Rgba16Float, linear filtering, clamp-to-edge
pub struct HdrTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
    pub width: u32,
    pub height: u32,
}

impl HdrTexture {
    /// Upload, downscaling first when the image exceeds the device's 2D texture limit
    pub fn upload(device: &wgpu::Device, queue: &wgpu::Queue, image: &HdrImage) -> Self {
        let max = device.limits().max_texture_dimension_2d;
        let (width, height) = fit_to_limit(image.width, image.height, max);
        if (width, height) != (image.width, image.height) {
            log::warn!(
                "Equirect map {}x{} exceeds the {} texel limit, downscaling to {}x{}",
                image.width,
                image.height,
                max,
                width,
                height
            );
            return Self::upload_exact(device, queue, &image.downscaled(width, height));
        }
        Self::upload_exact(device, queue, image)
    }

    fn upload_exact(device: &wgpu::Device, queue: &wgpu::Queue, image: &HdrImage) -> Self {
        let size = wgpu::Extent3d {
            width: image.width,
            height: image.height,
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Equirect HDR"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba16Float,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        let data = image.to_rgba16f();
        queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            bytemuck::cast_slice(&data),
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(image.width * 8),
                rows_per_image: Some(image.height),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Equirect Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        Self {
            texture,
            view,
            sampler,
            width: image.width,
            height: image.height,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(width: u32, height: u32) -> HdrImage {
        let data = (0..width * height)
            .flat_map(|i| [(i % width) as f32, (i / width) as f32, 0.0, 1.0])
            .collect();
        HdrImage::from_rgba32f(width, height, data).unwrap()
    }

    #[test]
    fn zenith_maps_to_top_row() {
        let (_, v) = equirect_uv(Vec3::Y);
        assert!(v.abs() < 1e-6);
        let (_, v) = equirect_uv(Vec3::NEG_Y);
        assert!((v - 1.0).abs() < 1e-6);
    }

    #[test]
    fn horizon_directions_map_to_middle_row() {
        let (u, v) = equirect_uv(Vec3::X);
        assert!((u - 0.5).abs() < 1e-6);
        assert!((v - 0.5).abs() < 1e-6);
        let (u, _) = equirect_uv(Vec3::Z);
        assert!((u - 0.75).abs() < 1e-6);
        let (u, _) = equirect_uv(Vec3::NEG_Z);
        assert!((u - 0.25).abs() < 1e-6);
    }

    #[test]
    fn direction_round_trips_through_uv() {
        for dir in [
            Vec3::new(0.3, 0.5, -0.8),
            Vec3::new(-0.9, -0.1, 0.2),
            Vec3::new(0.1, -0.95, 0.3),
        ] {
            let (u, v) = equirect_uv(dir);
            let back = equirect_direction(u, v);
            assert!((back - dir.normalize()).length() < 1e-4);
        }
    }

    #[test]
    fn nearest_sample_picks_expected_pixel() {
        let image = gradient(8, 4);
        assert_eq!(image.sample_direction(Vec3::Y).y, 0.0);
        assert_eq!(image.sample_direction(Vec3::NEG_Y).y, 3.0);
        // +X sits at u = 0.5
        assert_eq!(image.sample_direction(Vec3::X).x, 4.0);
    }

    #[test]
    fn rejects_mismatched_buffer() {
        assert!(HdrImage::from_rgba32f(2, 2, vec![0.0; 3]).is_err());
        assert!(HdrImage::from_rgba32f(0, 2, vec![]).is_err());
    }

    #[test]
    fn half_conversion_keeps_values() {
        let image = gradient(2, 1);
        let half = image.to_rgba16f();
        assert_eq!(half.len(), 8);
        assert_eq!(half[4].to_f32(), 1.0);
        assert_eq!(half[7].to_f32(), 1.0);
    }

    #[test]
    fn procedural_sky_is_brighter_above() {
        let sky = HdrImage::procedural_sky(64, 32);
        let up = sky.sample_direction(Vec3::new(0.0, 1.0, 0.01));
        let down = sky.sample_direction(Vec3::new(0.0, -1.0, 0.01));
        assert!(up.z > down.z);
        assert!(sky.pixels.iter().all(|p| p.w == 1.0));
    }

    #[test]
    fn oversized_equirect_fits_default_limit() {
        assert_eq!(fit_to_limit(16384, 8192, 8192), (8192, 4096));
        assert_eq!(fit_to_limit(4096, 2048, 8192), (4096, 2048));
        assert_eq!(fit_to_limit(9000, 10, 8192), (8192, 9));
    }

    #[test]
    fn downscale_keeps_hdr_range() {
        let data = [20.0f32, 0.5, 3.0, 1.0].repeat(8 * 4);
        let image = HdrImage::from_rgba32f(8, 4, data).unwrap();
        let small = image.downscaled(4, 2);
        assert_eq!((small.width, small.height), (4, 2));
        assert_eq!(small.pixels.len(), 8);
        assert!(small
            .pixels
            .iter()
            .all(|p| (p.x - 20.0).abs() < 1e-2 && (p.z - 3.0).abs() < 1e-2));
    }

    #[test]
    fn downscale_averages_bright_and_dark_texels() {
        let data: Vec<f32> = (0..4 * 2)
            .flat_map(|i| {
                let v = if i % 2 == 0 { 10.0 } else { 0.0 };
                [v, v, v, 1.0]
            })
            .collect();
        let image = HdrImage::from_rgba32f(4, 2, data).unwrap();
        let small = image.downscaled(2, 1);
        let mean = small.pixels.iter().map(|p| p.x).sum::<f32>() / small.pixels.len() as f32;
        assert!(mean > 2.0 && mean < 8.0, "mean {}", mean);
        assert!(small.pixels.iter().all(|p| p.x > 1.0));
    }

    #[test]
    fn decodes_radiance_bytes() {
        let pixels = vec![image::Rgb([1.5f32, 0.25, 4.0]); 4];
        let mut bytes = Vec::new();
        image::codecs::hdr::HdrEncoder::new(&mut bytes)
            .encode(&pixels, 2, 2)
            .unwrap();
        let image = HdrImage::from_bytes(&bytes).unwrap();
        assert_eq!((image.width, image.height), (2, 2));
        let p = image.pixel(1, 1);
        assert!((p.x - 1.5).abs() < 0.05);
        assert!((p.y - 0.25).abs() < 0.01);
        assert!((p.z - 4.0).abs() < 0.1);
        assert_eq!(p.w, 1.0);
    }

    #[test]
    fn radiance_values_above_one_survive_decoding() {
        let pixels = vec![image::Rgb([12.0f32, 0.5, 300.0]); 6];
        let mut bytes = Vec::new();
        image::codecs::hdr::HdrEncoder::new(&mut bytes)
            .encode(&pixels, 3, 2)
            .unwrap();
        let image = HdrImage::from_bytes(&bytes).unwrap();
        assert_eq!((image.width, image.height), (3, 2));
        assert!(image.pixels.iter().all(|p| p.x > 11.0 && p.z > 250.0));
    }
}
