use serde::{Deserialize, Serialize};

use crate::{lexicon, palette, rooms, vocab};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
	En,
	He,
	#[default]
	Auto,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectFilter {
	pub label: String,
	pub color: Option<String>,
	pub material: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedQuery {
	pub room: Option<String>,
	pub objects: Vec<ObjectFilter>,
	pub free_colors: Vec<String>,
	pub free_materials: Vec<String>,
	/// Post-translation text, used for embedding.
	pub normalized_text: String,
}

/// Multi-word surface forms folded into single tokens before extraction.
/// Compound rooms come before anything a suffix could shadow.
const COMPOUNDS: &[(&str, &str)] = &[
	("living room", "living_room"),
	("dining room", "dining_room"),
	("kids room", "kids_room"),
	("outdoor patio", "outdoor_patio"),
	("dining table", "dining_table"),
	("coffee table", "coffee_table"),
	("kitchen island", "kitchen_island"),
	("range hood", "range_hood"),
	("stainless steel", "stainless_steel"),
	("washing machine", "washer"),
];

#[derive(Debug, Clone, Copy, PartialEq)]
enum TokenKind {
	Object(&'static str),
	Color,
	Material,
	Room,
	Word,
}

/// Parse a query into structured filters plus the normalized text.
///
/// `Auto` resolves to Hebrew when any Hebrew letter is present. Hebrew input
/// is translated over the lexicon before extraction, so the extraction rules
/// below only ever see English tokens.
pub fn parse(query: &str, lang: Language) -> ParsedQuery {
	let resolved = match lang {
		Language::Auto =>
			if lexicon::contains_hebrew(query) {
				Language::He
			} else {
				Language::En
			},
		other => other,
	};
	let normalized_text = match resolved {
		Language::He => lexicon::translate(query),
		_ => query.split_whitespace().collect::<Vec<_>>().join(" "),
	};

	let mut lowered = normalized_text.to_lowercase();
	for (from, to) in COMPOUNDS {
		if lowered.contains(from) {
			lowered = lowered.replace(from, to);
		}
	}

	let tokens: Vec<(String, TokenKind)> = lowered
		.split_whitespace()
		.map(|raw| {
			let word: String =
				raw.chars().filter(|c| c.is_alphanumeric() || *c == '_').collect();
			let kind = if rooms::is_room(&word) && word != rooms::ROOM_UNKNOWN {
				TokenKind::Room
			} else if let Some(label) = vocab::canonicalize_label(&word) {
				TokenKind::Object(label)
			} else if palette::is_color(&word) {
				TokenKind::Color
			} else if vocab::is_material(&word) {
				TokenKind::Material
			} else {
				TokenKind::Word
			};
			(word, kind)
		})
		.collect();

	let room = tokens
		.iter()
		.find(|(_, kind)| *kind == TokenKind::Room)
		.map(|(word, _)| word.clone());

	// One filter per object token, in query order.
	let mut objects: Vec<(usize, ObjectFilter)> = tokens
		.iter()
		.enumerate()
		.filter_map(|(position, (_, kind))| match kind {
			TokenKind::Object(label) => Some((
				position,
				ObjectFilter { label: (*label).to_string(), color: None, material: None },
			)),
			_ => None,
		})
		.collect();

	let mut free_colors = Vec::new();
	let mut free_materials = Vec::new();
	for (position, (word, kind)) in tokens.iter().enumerate() {
		match kind {
			TokenKind::Color => {
				match find_bound_object(&mut objects, position) {
					Some(filter) if filter.color.is_none() => filter.color = Some(word.clone()),
					_ =>
						if !free_colors.contains(word) {
							free_colors.push(word.clone());
						},
				}
			},
			TokenKind::Material => {
				match find_bound_object(&mut objects, position) {
					Some(filter) if filter.material.is_none() =>
						filter.material = Some(word.clone()),
					_ =>
						if !free_materials.contains(word) {
							free_materials.push(word.clone());
						},
				}
			},
			_ => {},
		}
	}

	ParsedQuery {
		room,
		objects: objects.into_iter().map(|(_, filter)| filter).collect(),
		free_colors,
		free_materials,
		normalized_text,
	}
}

/// The object an attribute token binds to: the adjacent object first (English
/// puts the adjective before the noun, translated Hebrew after), then the
/// nearest following object. `None` leaves the attribute as a free filter.
fn find_bound_object(
	objects: &mut [(usize, ObjectFilter)],
	attribute_position: usize,
) -> Option<&mut ObjectFilter> {
	let slot = objects
		.iter()
		.position(|(position, _)| *position == attribute_position + 1)
		.or_else(|| {
			attribute_position
				.checked_sub(1)
				.and_then(|prev| objects.iter().position(|(position, _)| *position == prev))
		})
		.or_else(|| objects.iter().position(|(position, _)| *position > attribute_position))?;
	Some(&mut objects[slot].1)
}
