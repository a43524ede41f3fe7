use serde::{Deserialize, Serialize};

/// CIELAB color value (D65). `l` spans 0..=100, `a`/`b` roughly -128..=127.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Lab {
	#[serde(rename = "L")]
	pub l: f32,
	pub a: f32,
	pub b: f32,
}

impl Lab {
	pub fn new(l: f32, a: f32, b: f32) -> Self {
		Self { l, a, b }
	}

	pub fn distance_sq(&self, other: &Lab) -> f32 {
		let dl = self.l - other.l;
		let da = self.a - other.a;
		let db = self.b - other.b;
		dl * dl + da * da + db * db
	}

	pub fn chroma(&self) -> f32 {
		(self.a * self.a + self.b * self.b).sqrt()
	}
}

/// The closed 18-name palette with CIELAB reference points.
pub const PALETTE: &[(&str, Lab)] = &[
	("black", Lab { l: 0.0, a: 0.0, b: 0.0 }),
	("white", Lab { l: 100.0, a: 0.0, b: 0.0 }),
	("gray", Lab { l: 53.6, a: 0.0, b: 0.0 }),
	("dark_gray", Lab { l: 27.1, a: 0.0, b: 0.0 }),
	("light_gray", Lab { l: 77.7, a: 0.0, b: 0.0 }),
	("brown", Lab { l: 37.5, a: 26.5, b: 41.0 }),
	("beige", Lab { l: 95.9, a: -4.2, b: 11.7 }),
	("cream", Lab { l: 98.6, a: -4.6, b: 21.0 }),
	("red", Lab { l: 53.2, a: 80.1, b: 67.2 }),
	("blue", Lab { l: 32.3, a: 79.2, b: -107.9 }),
	("navy", Lab { l: 13.0, a: 47.5, b: -64.7 }),
	("green", Lab { l: 46.2, a: -51.7, b: 49.9 }),
	("yellow", Lab { l: 97.1, a: -21.6, b: 94.5 }),
	("purple", Lab { l: 29.8, a: 58.9, b: -36.5 }),
	("pink", Lab { l: 83.6, a: 24.1, b: 3.3 }),
	("orange", Lab { l: 74.9, a: 23.9, b: 78.9 }),
	("silver", Lab { l: 78.6, a: -0.6, b: -3.0 }),
	("gold", Lab { l: 86.9, a: -1.9, b: 87.1 }),
];

pub fn is_color(name: &str) -> bool {
	PALETTE.iter().any(|(color, _)| *color == name)
}

/// Nearest palette name for a LAB value.
///
/// Near-achromatic values short-circuit into the neutral ladder so a dim blue
/// wall never reads as `navy` and an off-white never reads as `beige`.
pub fn nearest_name(lab: &Lab) -> &'static str {
	if lab.a.abs() < 12.0 && lab.b.abs() < 12.0 {
		return neutral_name(lab.l);
	}
	PALETTE
		.iter()
		.min_by(|(_, x), (_, y)| {
			lab.distance_sq(x)
				.partial_cmp(&lab.distance_sq(y))
				.unwrap_or(std::cmp::Ordering::Equal)
		})
		.map(|(name, _)| *name)
		.unwrap_or("gray")
}

fn neutral_name(l: f32) -> &'static str {
	if l < 15.0 {
		"black"
	} else if l < 40.0 {
		"dark_gray"
	} else if l < 70.0 {
		"gray"
	} else if l < 90.0 {
		"light_gray"
	} else {
		"white"
	}
}
