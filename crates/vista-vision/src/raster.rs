use color_eyre::{Result, eyre::eyre};
use image::{DynamicImage, RgbImage, imageops::FilterType};

/// Decoded image, downscaled for analysis with the original size preserved.
#[derive(Debug, Clone)]
pub struct Raster {
	pub image: RgbImage,
	pub original_width: u32,
	pub original_height: u32,
}

/// Decode bytes to RGB and cap the longest side at `max_px`. The stored
/// `original_*` dimensions always reflect the source file.
pub fn decode(bytes: &[u8], max_px: u32) -> Result<Raster> {
	let decoded = image::load_from_memory(bytes).map_err(|err| eyre!("Image decode failed: {err}."))?;
	let (original_width, original_height) = (decoded.width(), decoded.height());
	if original_width == 0 || original_height == 0 {
		return Err(eyre!("Image has a zero dimension."));
	}

	let longest = original_width.max(original_height);
	let image = if longest > max_px {
		DynamicImage::ImageRgb8(decoded.to_rgb8())
			.resize(max_px, max_px, FilterType::Triangle)
			.to_rgb8()
	} else {
		decoded.to_rgb8()
	};

	Ok(Raster { image, original_width, original_height })
}
