use crate::rooms::ROOM_UNKNOWN;

/// Facts about one detected object, already canonicalized.
#[derive(Debug, Clone)]
pub struct CaptionFact {
	pub label: String,
	pub color: Option<String>,
	pub material: Option<String>,
	pub area_pixels: u64,
}

const MATERIAL_ADJECTIVES: &[(&str, &str)] = &[
	("wood", "wooden"),
	("stainless_steel", "stainless"),
	("tile", "tiled"),
	("stone", "stone"),
];

const NUMBER_WORDS: &[&str] =
	&["zero", "one", "two", "three", "four", "five", "six", "seven", "eight", "nine", "ten"];

/// Render the structured English caption:
/// `"{Room} with {top-3 objects with color + material}; {style tags}."`
///
/// Objects are grouped by label, ordered by covered area, and capped at three
/// groups so captions stay embeddable. An unknown room renders as "Interior".
pub fn render(room: &str, objects: &[CaptionFact], style_tags: &[String]) -> String {
	let mut groups: Vec<(String, Option<String>, Option<String>, u64, u64)> = Vec::new();
	for fact in objects {
		match groups.iter_mut().find(|(label, ..)| *label == fact.label) {
			Some((_, _, _, count, area)) => {
				*count += 1;
				*area += fact.area_pixels;
			},
			None => groups.push((
				fact.label.clone(),
				fact.color.clone(),
				fact.material.clone(),
				1,
				fact.area_pixels,
			)),
		}
	}
	groups.sort_by(|a, b| b.4.cmp(&a.4).then_with(|| a.0.cmp(&b.0)));
	groups.truncate(3);

	let room_display = if room == ROOM_UNKNOWN || room.is_empty() {
		"Interior".to_string()
	} else {
		title_case(&room.replace('_', " "))
	};

	let mut caption = room_display;
	if !groups.is_empty() {
		let descriptions: Vec<String> = groups
			.iter()
			.map(|(label, color, material, count, _)| describe(label, color, material, *count))
			.collect();
		caption.push_str(" with ");
		caption.push_str(&descriptions.join(", "));
	}
	if !style_tags.is_empty() {
		caption.push_str("; ");
		caption.push_str(&style_tags.join(", "));
		caption.push_str(" style");
	}
	caption.push('.');
	caption
}

fn describe(label: &str, color: &Option<String>, material: &Option<String>, count: u64) -> String {
	let mut parts = Vec::new();
	if count > 1 {
		parts.push(count_word(count));
	}
	if let Some(color) = color.as_deref().filter(|c| *c != "unknown") {
		parts.push(color.replace('_', " "));
	}
	if let Some(material) = material.as_deref().filter(|m| *m != "unknown") {
		parts.push(material_adjective(material).to_string());
	}
	let mut display = label.replace('_', " ");
	if count > 1 {
		display.push('s');
	}
	parts.push(display);
	parts.join(" ")
}

fn material_adjective(material: &str) -> &str {
	MATERIAL_ADJECTIVES
		.iter()
		.find(|(name, _)| *name == material)
		.map(|(_, adjective)| *adjective)
		.unwrap_or(material)
}

fn count_word(count: u64) -> String {
	NUMBER_WORDS.get(count as usize).map(|word| (*word).to_string()).unwrap_or_else(|| {
		count.to_string()
	})
}

fn title_case(text: &str) -> String {
	let mut chars = text.chars();
	match chars.next() {
		Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
		None => String::new(),
	}
}
