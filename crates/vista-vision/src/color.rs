use image::RgbImage;
use vista_domain::bbox::BBox;
use vista_domain::palette::{self, Lab};

const MAX_SAMPLES: usize = 4_096;
const KMEANS_K: usize = 3;
const KMEANS_ROUNDS: usize = 15;
/// Clusters below this share are noise and never reported.
const MIN_CLUSTER_SHARE: f32 = 0.05;

#[derive(Debug, Clone)]
pub struct ColorCluster {
	pub lab: Lab,
	pub name: &'static str,
	pub share: f32,
}

/// sRGB → CIELAB (D65).
pub fn rgb_to_lab(r: u8, g: u8, b: u8) -> Lab {
	let rl = linearize(r);
	let gl = linearize(g);
	let bl = linearize(b);

	let x = 0.412_456_4 * rl + 0.357_576_1 * gl + 0.180_437_5 * bl;
	let y = 0.212_672_9 * rl + 0.715_152_2 * gl + 0.072_175_0 * bl;
	let z = 0.019_333_9 * rl + 0.119_192_0 * gl + 0.950_304_1 * bl;

	let fx = lab_f(x / 0.950_47);
	let fy = lab_f(y);
	let fz = lab_f(z / 1.088_83);

	Lab::new(
		(116.0 * fy - 16.0) as f32,
		(500.0 * (fx - fy)) as f32,
		(200.0 * (fy - fz)) as f32,
	)
}

fn linearize(channel: u8) -> f64 {
	let c = channel as f64 / 255.0;
	if c <= 0.040_45 { c / 12.92 } else { ((c + 0.055) / 1.055).powf(2.4) }
}

fn lab_f(t: f64) -> f64 {
	if t > 0.008_856 { t.cbrt() } else { 7.787 * t + 16.0 / 116.0 }
}

/// Dominant colors of a box region: k-means (k=3) over LAB pixels subsampled
/// to at most 4096 points, clusters ordered by share. Initialization is by
/// luminance percentiles so repeated runs over the same pixels are identical.
pub fn extract(image: &RgbImage, bbox: &BBox) -> Vec<ColorCluster> {
	let samples = sample_lab_pixels(image, bbox);
	if samples.is_empty() {
		return Vec::new();
	}

	let k = KMEANS_K.min(samples.len());
	let mut centers = initial_centers(&samples, k);
	let mut assignments = vec![0usize; samples.len()];
	for _ in 0..KMEANS_ROUNDS {
		let mut changed = false;
		for (index, sample) in samples.iter().enumerate() {
			let nearest = nearest_center(sample, &centers);
			if assignments[index] != nearest {
				assignments[index] = nearest;
				changed = true;
			}
		}

		let mut sums = vec![(0.0f64, 0.0f64, 0.0f64, 0usize); k];
		for (index, sample) in samples.iter().enumerate() {
			let slot = &mut sums[assignments[index]];
			slot.0 += sample.l as f64;
			slot.1 += sample.a as f64;
			slot.2 += sample.b as f64;
			slot.3 += 1;
		}
		for (center, (l, a, b, count)) in centers.iter_mut().zip(sums) {
			if count > 0 {
				*center = Lab::new(
					(l / count as f64) as f32,
					(a / count as f64) as f32,
					(b / count as f64) as f32,
				);
			}
		}
		if !changed {
			break;
		}
	}

	let mut counts = vec![0usize; k];
	for assignment in &assignments {
		counts[*assignment] += 1;
	}
	let total = samples.len() as f32;
	let mut clusters: Vec<ColorCluster> = centers
		.into_iter()
		.zip(counts)
		.filter(|(_, count)| *count as f32 / total >= MIN_CLUSTER_SHARE)
		.map(|(lab, count)| ColorCluster { lab, name: cluster_name(&lab), share: count as f32 / total })
		.collect();
	clusters.sort_by(|a, b| b.share.partial_cmp(&a.share).unwrap_or(std::cmp::Ordering::Equal));
	clusters
}

/// Very dark and very light clusters snap to black/white regardless of
/// chroma; everything else goes through the palette lookup.
fn cluster_name(lab: &Lab) -> &'static str {
	if lab.l < 15.0 {
		"black"
	} else if lab.l > 90.0 {
		"white"
	} else {
		palette::nearest_name(lab)
	}
}

fn sample_lab_pixels(image: &RgbImage, bbox: &BBox) -> Vec<Lab> {
	let x0 = bbox.x.min(image.width());
	let y0 = bbox.y.min(image.height());
	let x1 = (bbox.x + bbox.w).min(image.width());
	let y1 = (bbox.y + bbox.h).min(image.height());
	if x1 <= x0 || y1 <= y0 {
		return Vec::new();
	}

	let pixel_count = ((x1 - x0) * (y1 - y0)) as usize;
	let stride = pixel_count.div_ceil(MAX_SAMPLES).max(1);
	let mut samples = Vec::with_capacity(pixel_count.min(MAX_SAMPLES));
	let mut index = 0usize;
	for y in y0..y1 {
		for x in x0..x1 {
			if index % stride == 0 {
				let pixel = image.get_pixel(x, y);
				samples.push(rgb_to_lab(pixel[0], pixel[1], pixel[2]));
			}
			index += 1;
		}
	}
	samples
}

fn initial_centers(samples: &[Lab], k: usize) -> Vec<Lab> {
	let mut by_luminance: Vec<Lab> = samples.to_vec();
	by_luminance.sort_by(|a, b| {
		a.l.partial_cmp(&b.l)
			.unwrap_or(std::cmp::Ordering::Equal)
			.then_with(|| a.a.partial_cmp(&b.a).unwrap_or(std::cmp::Ordering::Equal))
			.then_with(|| a.b.partial_cmp(&b.b).unwrap_or(std::cmp::Ordering::Equal))
	});
	(0..k)
		.map(|i| by_luminance[(2 * i + 1) * by_luminance.len() / (2 * k)])
		.collect()
}

fn nearest_center(sample: &Lab, centers: &[Lab]) -> usize {
	let mut best = 0usize;
	let mut best_distance = f32::INFINITY;
	for (index, center) in centers.iter().enumerate() {
		let distance = sample.distance_sq(center);
		if distance < best_distance {
			best = index;
			best_distance = distance;
		}
	}
	best
}
