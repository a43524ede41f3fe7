use image::{RgbImage, imageops::FilterType};

const DCT_SIZE: usize = 32;
const HASH_SIZE: usize = 8;

/// 8×8 DCT perceptual hash over the luminance channel.
///
/// The raster is reduced to a 32×32 grayscale grid, transformed with a 2D
/// DCT-II, and the 8×8 low-frequency block is thresholded at its median to
/// produce 64 bits, row-major from the top-left coefficient.
pub fn compute(image: &RgbImage) -> u64 {
	let gray = image::imageops::grayscale(image);
	let small = image::imageops::resize(&gray, DCT_SIZE as u32, DCT_SIZE as u32, FilterType::Triangle);

	let mut grid = [[0.0f64; DCT_SIZE]; DCT_SIZE];
	for y in 0..DCT_SIZE {
		for x in 0..DCT_SIZE {
			grid[y][x] = small.get_pixel(x as u32, y as u32).0[0] as f64;
		}
	}
	let coefficients = dct_2d(&grid);

	let mut low_freq = [0.0f64; HASH_SIZE * HASH_SIZE];
	for y in 0..HASH_SIZE {
		for x in 0..HASH_SIZE {
			low_freq[y * HASH_SIZE + x] = coefficients[y][x];
		}
	}
	let median = median_of(low_freq);

	let mut hash = 0u64;
	for (bit, value) in low_freq.iter().enumerate() {
		if *value > median {
			hash |= 1 << bit;
		}
	}
	hash
}

pub fn hamming_distance(a: u64, b: u64) -> u32 {
	(a ^ b).count_ones()
}

fn dct_2d(grid: &[[f64; DCT_SIZE]; DCT_SIZE]) -> [[f64; DCT_SIZE]; DCT_SIZE] {
	let mut rows = [[0.0f64; DCT_SIZE]; DCT_SIZE];
	for y in 0..DCT_SIZE {
		rows[y] = dct_1d(&grid[y]);
	}
	let mut out = [[0.0f64; DCT_SIZE]; DCT_SIZE];
	for x in 0..DCT_SIZE {
		let mut column = [0.0f64; DCT_SIZE];
		for y in 0..DCT_SIZE {
			column[y] = rows[y][x];
		}
		let transformed = dct_1d(&column);
		for y in 0..DCT_SIZE {
			out[y][x] = transformed[y];
		}
	}
	out
}

fn dct_1d(input: &[f64; DCT_SIZE]) -> [f64; DCT_SIZE] {
	let n = DCT_SIZE as f64;
	let mut out = [0.0f64; DCT_SIZE];
	for (k, slot) in out.iter_mut().enumerate() {
		let mut sum = 0.0;
		for (i, value) in input.iter().enumerate() {
			sum += value
				* (std::f64::consts::PI / n * (i as f64 + 0.5) * k as f64).cos();
		}
		*slot = sum;
	}
	out
}

fn median_of(mut values: [f64; HASH_SIZE * HASH_SIZE]) -> f64 {
	values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
	let mid = values.len() / 2;
	(values[mid - 1] + values[mid]) / 2.0
}
