use serde::{Deserialize, Serialize};

/// Axis-aligned box in source-image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BBox {
	pub x: u32,
	pub y: u32,
	pub w: u32,
	pub h: u32,
}

impl BBox {
	pub fn area(&self) -> u64 {
		self.w as u64 * self.h as u64
	}

	/// Intersection-over-union. Degenerate boxes yield 0.
	pub fn iou(&self, other: &BBox) -> f32 {
		let x1 = self.x.max(other.x);
		let y1 = self.y.max(other.y);
		let x2 = (self.x + self.w).min(other.x + other.w);
		let y2 = (self.y + self.h).min(other.y + other.h);
		if x2 <= x1 || y2 <= y1 {
			return 0.0;
		}
		let intersection = (x2 - x1) as u64 * (y2 - y1) as u64;
		let union = self.area() + other.area() - intersection;
		if union == 0 {
			return 0.0;
		}
		intersection as f32 / union as f32
	}
}
