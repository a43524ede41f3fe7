/// Closed object vocabulary. Detector labels outside this set are kept only
/// after canonicalization maps them in; everything else is discarded upstream.
pub const CANONICAL_LABELS: &[&str] = &[
	"dining_table",
	"sofa",
	"refrigerator",
	"oven",
	"sink",
	"bed",
	"toilet",
	"shower",
	"bathtub",
	"wardrobe",
	"desk",
	"tv",
	"coffee_table",
	"kitchen_island",
	"stove",
	"range_hood",
	"microwave",
	"chair",
	"washer",
	"dryer",
	"table",
	"lamp",
	"cabinet",
	"mirror",
	"rug",
	"curtain",
];

pub const MATERIALS: &[&str] = &[
	"marble",
	"wood",
	"granite",
	"glass",
	"metal",
	"fabric",
	"leather",
	"tile",
	"stone",
	"concrete",
	"plastic",
	"stainless_steel",
];

/// Detector-label synonyms mapped onto the canonical vocabulary. Raw labels
/// are lowercased and space-normalized before lookup.
const LABEL_SYNONYMS: &[(&str, &str)] = &[
	("couch", "sofa"),
	("tv monitor", "tv"),
	("tvmonitor", "tv"),
	("television", "tv"),
	("fridge", "refrigerator"),
	("washing machine", "washer"),
	("washing_machine", "washer"),
	("cooktop", "stove"),
	("stovetop", "stove"),
	("night stand", "cabinet"),
	("nightstand", "cabinet"),
	("armchair", "chair"),
	("office chair", "chair"),
	("office_chair", "chair"),
	("dining table", "dining_table"),
	("kitchen island", "kitchen_island"),
	("coffee table", "coffee_table"),
	("range hood", "range_hood"),
	("closet", "wardrobe"),
	("carpet", "rug"),
	("drape", "curtain"),
];

pub fn is_canonical_label(label: &str) -> bool {
	CANONICAL_LABELS.contains(&label)
}

pub fn is_material(name: &str) -> bool {
	MATERIALS.contains(&name)
}

/// Map a raw detector label onto the canonical vocabulary. Returns `None`
/// for labels the engine does not track (people, food, vehicles, ...).
pub fn canonicalize_label(raw: &str) -> Option<&'static str> {
	let normalized = raw.trim().to_lowercase();
	if let Some(found) = CANONICAL_LABELS.iter().find(|label| **label == normalized) {
		return Some(found);
	}
	let spaced = normalized.replace('_', " ");
	LABEL_SYNONYMS
		.iter()
		.find(|(from, _)| *from == normalized || *from == spaced)
		.map(|(_, to)| *to)
}
