/// Curated Hebrew → English lexicon covering rooms, objects, colors,
/// materials and the connectives that appear in real queries. Translation is
/// replacement-based, longest Hebrew phrase first, so `שולחן אוכל` wins over
/// `שולחן` and `אי מטבח` wins over `מטבח`.
pub const LEXICON: &[(&str, &str)] = &[
	// Rooms.
	("מטבח", "kitchen"),
	("סלון", "living_room"),
	("פינת אוכל", "dining_room"),
	("חדר שינה", "bedroom"),
	("שירותים", "bathroom"),
	("אמבטיה", "bathroom"),
	("משרד", "office"),
	("מסדרון", "hallway"),
	("מרפסת", "balcony"),
	("חדר ילדים", "kids_room"),
	("חדר כביסה", "laundry"),
	("מוסך", "garage"),
	// Objects.
	("שולחן אוכל", "dining_table"),
	("שולחן קפה", "coffee_table"),
	("שולחן עבודה", "desk"),
	("שולחן", "table"),
	("כיסא", "chair"),
	("ספה", "sofa"),
	("מקרר", "refrigerator"),
	("תנור", "oven"),
	("כיריים", "stove"),
	("כיור", "sink"),
	("אי מטבח", "kitchen_island"),
	("טלוויזיה", "tv"),
	("מיטה", "bed"),
	("ארון", "wardrobe"),
	("אסלה", "toilet"),
	("מקלחת", "shower"),
	("אמבט", "bathtub"),
	("מכונת כביסה", "washer"),
	("מנורה", "lamp"),
	("מראה", "mirror"),
	("שטיח", "rug"),
	("וילון", "curtain"),
	// Colors.
	("שחור", "black"),
	("לבן", "white"),
	("אפור", "gray"),
	("חום", "brown"),
	("בז׳", "beige"),
	("אדום", "red"),
	("כחול", "blue"),
	("ירוק", "green"),
	("צהוב", "yellow"),
	("סגול", "purple"),
	("ורוד", "pink"),
	("כתום", "orange"),
	("כסוף", "silver"),
	("זהב", "gold"),
	// Materials.
	("עץ", "wood"),
	("שיש", "marble"),
	("גרניט", "granite"),
	("זכוכית", "glass"),
	("מתכת", "metal"),
	("נירוסטה", "stainless_steel"),
	("בד", "fabric"),
	("עור", "leather"),
	("אריח", "tile"),
	("אבן", "stone"),
	("בטון", "concrete"),
	("פלסטיק", "plastic"),
	// Connectives.
	("עם", "with"),
];

/// True when the text contains any letter from the Hebrew block.
pub fn contains_hebrew(input: &str) -> bool {
	input.chars().any(|c| matches!(c as u32, 0x0590..=0x05FF))
}

/// Translate a Hebrew query word-by-word over the lexicon. Phrases are
/// replaced longest-first; words without an entry pass through unchanged.
pub fn translate(query: &str) -> String {
	let mut entries: Vec<(&str, &str)> = LEXICON.to_vec();
	entries.sort_by(|a, b| b.0.chars().count().cmp(&a.0.chars().count()));

	let mut out = query.to_string();
	for (he, en) in entries {
		if out.contains(he) {
			out = out.replace(he, en);
		}
	}
	out.split_whitespace().collect::<Vec<_>>().join(" ")
}
