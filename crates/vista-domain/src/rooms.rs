/// Canonical room vocabulary. `unknown` is the fallback, never voted for.
pub const ROOMS: &[&str] = &[
	"kitchen",
	"living_room",
	"bedroom",
	"bathroom",
	"dining_room",
	"office",
	"hallway",
	"balcony",
	"kids_room",
	"laundry",
	"garage",
	"outdoor_patio",
	"entryway",
	"unknown",
];

pub const ROOM_UNKNOWN: &str = "unknown";

/// Minimum softmax probability for the winning room to be accepted.
const ROOM_CONFIDENCE_THRESHOLD: f32 = 0.4;

/// Object → room vote weights. Anchors that identify a room on their own
/// carry 4-5, shared evidence 2-3, weak hints under 1.
const ROOM_WEIGHTS: &[(&str, &[(&str, f32)])] = &[
	("refrigerator", &[("kitchen", 3.0), ("dining_room", 0.5)]),
	("oven", &[("kitchen", 4.0)]),
	("stove", &[("kitchen", 4.0)]),
	("range_hood", &[("kitchen", 4.0)]),
	("microwave", &[("kitchen", 2.5), ("office", 0.5)]),
	("kitchen_island", &[("kitchen", 4.5)]),
	("sink", &[("kitchen", 2.0), ("bathroom", 2.5), ("laundry", 1.0)]),
	("dining_table", &[("dining_room", 3.5), ("kitchen", 1.0)]),
	("table", &[("dining_room", 1.0), ("kitchen", 0.5), ("office", 0.5)]),
	("chair", &[("dining_room", 1.5), ("office", 0.5), ("living_room", 0.5)]),
	("sofa", &[("living_room", 4.0)]),
	("tv", &[("living_room", 2.5), ("bedroom", 0.5)]),
	("coffee_table", &[("living_room", 3.0)]),
	("rug", &[("living_room", 1.0), ("bedroom", 0.5)]),
	("curtain", &[("living_room", 0.5), ("bedroom", 0.5)]),
	("lamp", &[("living_room", 0.5), ("bedroom", 0.5), ("office", 0.5)]),
	("bed", &[("bedroom", 5.0)]),
	("wardrobe", &[("bedroom", 3.0), ("hallway", 0.5)]),
	("mirror", &[("bathroom", 1.0), ("bedroom", 0.5), ("entryway", 0.5)]),
	("toilet", &[("bathroom", 5.0)]),
	("shower", &[("bathroom", 5.0)]),
	("bathtub", &[("bathroom", 5.0)]),
	("desk", &[("office", 3.5), ("bedroom", 0.5), ("kids_room", 0.5)]),
	("washer", &[("laundry", 4.5), ("kitchen", 0.5)]),
	("dryer", &[("laundry", 4.5)]),
	("cabinet", &[("kitchen", 1.0), ("bathroom", 0.5), ("hallway", 0.5)]),
];

pub fn is_room(name: &str) -> bool {
	ROOMS.contains(&name)
}

#[derive(Debug, Clone)]
pub struct RoomVote {
	pub room: &'static str,
	pub confidence: f32,
	/// Softmax probability per room with a positive raw vote, highest first.
	pub scores: Vec<(&'static str, f32)>,
}

/// Classify the room from detected objects by weighted voting.
///
/// Raw votes are `weight × label_confidence` summed per room, softmaxed over
/// the rooms that received any vote. The argmax wins when its probability
/// clears the threshold; otherwise the image stays `unknown` (the non-empty
/// score list is still persisted).
pub fn classify_room(objects: &[(&str, f32)]) -> RoomVote {
	let mut raw: Vec<(&'static str, f32)> = Vec::new();
	for (label, confidence) in objects {
		let Some((_, weights)) = ROOM_WEIGHTS.iter().find(|entry| entry.0 == *label) else {
			continue;
		};
		for (room, weight) in *weights {
			let vote = weight * confidence;
			match raw.iter_mut().find(|entry| entry.0 == *room) {
				Some(entry) => entry.1 += vote,
				None => raw.push((*room, vote)),
			}
		}
	}
	raw.retain(|(_, score)| *score > 0.0);
	if raw.is_empty() {
		return RoomVote { room: ROOM_UNKNOWN, confidence: 0.0, scores: Vec::new() };
	}

	let max = raw.iter().map(|(_, score)| *score).fold(f32::NEG_INFINITY, f32::max);
	let mut denominator = 0.0;
	for (_, score) in &raw {
		denominator += (score - max).exp();
	}
	let mut scores: Vec<(&'static str, f32)> =
		raw.into_iter().map(|(room, score)| (room, (score - max).exp() / denominator)).collect();
	scores.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

	let (best_room, best_score) = scores[0];
	if best_score >= ROOM_CONFIDENCE_THRESHOLD {
		RoomVote { room: best_room, confidence: best_score, scores }
	} else {
		RoomVote { room: ROOM_UNKNOWN, confidence: best_score, scores }
	}
}
