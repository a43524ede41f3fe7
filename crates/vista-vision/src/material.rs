use image::{GrayImage, RgbImage};
use vista_domain::bbox::BBox;

use crate::color::rgb_to_lab;

/// Rule confidences below this never leave the heuristic.
const MIN_CONFIDENCE: f32 = 0.4;

const APPLIANCES: &[&str] =
	&["refrigerator", "oven", "microwave", "sink", "range_hood", "stove", "washer", "dryer"];
const TABLES: &[&str] = &["dining_table", "coffee_table", "desk", "table"];
const SEATING: &[&str] = &["chair", "sofa"];

#[derive(Debug, Clone, Copy)]
struct TextureStats {
	mean_luma: f32,
	laplacian_var: f32,
	mean_chroma: f32,
	warm: bool,
}

/// Heuristic material inference from luminance texture, hue, and the label
/// prior. Returns `("unknown", 0.0)` when no rule fires with confidence at
/// least 0.4.
pub fn infer(image: &RgbImage, bbox: &BBox, label: &str) -> (&'static str, f32) {
	let Some(stats) = texture_stats(image, bbox) else {
		return ("unknown", 0.0);
	};

	let (material, confidence) = if APPLIANCES.contains(&label) {
		if stats.mean_luma > 150.0 { ("stainless_steel", 0.7) } else { ("metal", 0.6) }
	} else if label == "kitchen_island" {
		// Countertops with busy local texture read as granite.
		if stats.laplacian_var > 500.0 { ("granite", 0.6) } else { ("marble", 0.5) }
	} else if TABLES.contains(&label) {
		if stats.mean_luma > 150.0 && stats.laplacian_var < 120.0 {
			// Glossy top: chroma separates marble from lacquered wood.
			if stats.mean_chroma < 10.0 { ("marble", 0.6) } else { ("wood", 0.55) }
		} else if stats.mean_luma > 180.0 && stats.laplacian_var < 60.0 {
			("glass", 0.5)
		} else {
			("wood", 0.6)
		}
	} else if SEATING.contains(&label) {
		if stats.warm && stats.laplacian_var < 200.0 { ("leather", 0.5) } else { ("fabric", 0.6) }
	} else if label == "wardrobe" || label == "cabinet" {
		("wood", 0.6)
	} else {
		("unknown", 0.0)
	};

	if confidence >= MIN_CONFIDENCE { (material, confidence) } else { ("unknown", 0.0) }
}

fn texture_stats(image: &RgbImage, bbox: &BBox) -> Option<TextureStats> {
	let x0 = bbox.x.min(image.width());
	let y0 = bbox.y.min(image.height());
	let x1 = (bbox.x + bbox.w).min(image.width());
	let y1 = (bbox.y + bbox.h).min(image.height());
	if x1 <= x0 || y1 <= y0 {
		return None;
	}

	let width = x1 - x0;
	let height = y1 - y0;
	let mut gray = GrayImage::new(width, height);
	let mut luma_sum = 0.0f64;
	let mut chroma_sum = 0.0f64;
	let mut a_sum = 0.0f64;
	let mut b_sum = 0.0f64;
	for y in 0..height {
		for x in 0..width {
			let pixel = image.get_pixel(x0 + x, y0 + y);
			let luma =
				0.299 * pixel[0] as f32 + 0.587 * pixel[1] as f32 + 0.114 * pixel[2] as f32;
			gray.put_pixel(x, y, image::Luma([luma as u8]));
			luma_sum += luma as f64;
			let lab = rgb_to_lab(pixel[0], pixel[1], pixel[2]);
			chroma_sum += lab.chroma() as f64;
			a_sum += lab.a as f64;
			b_sum += lab.b as f64;
		}
	}
	let count = (width * height) as f64;
	let mean_a = (a_sum / count) as f32;
	let mean_b = (b_sum / count) as f32;

	Some(TextureStats {
		mean_luma: (luma_sum / count) as f32,
		laplacian_var: laplacian_variance(&gray),
		mean_chroma: (chroma_sum / count) as f32,
		warm: mean_a > 5.0 && mean_b > 10.0,
	})
}

/// Variance of the 4-neighbor Laplacian, the usual sharpness/texture proxy.
fn laplacian_variance(gray: &GrayImage) -> f32 {
	let (width, height) = gray.dimensions();
	if width < 3 || height < 3 {
		return 0.0;
	}
	let mut responses = Vec::with_capacity(((width - 2) * (height - 2)) as usize);
	for y in 1..height - 1 {
		for x in 1..width - 1 {
			let center = gray.get_pixel(x, y).0[0] as f32;
			let response = gray.get_pixel(x - 1, y).0[0] as f32
				+ gray.get_pixel(x + 1, y).0[0] as f32
				+ gray.get_pixel(x, y - 1).0[0] as f32
				+ gray.get_pixel(x, y + 1).0[0] as f32
				- 4.0 * center;
			responses.push(response);
		}
	}
	let mean = responses.iter().sum::<f32>() / responses.len() as f32;
	responses.iter().map(|r| (r - mean) * (r - mean)).sum::<f32>() / responses.len() as f32
}
