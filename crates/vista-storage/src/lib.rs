pub mod db;
pub mod models;
pub mod retrieve;
pub mod schema;
pub mod stats;
pub mod writer;

/// pgvector text form of an embedding, for `$n::vector` binds.
pub fn vector_to_pg(vec: &[f32]) -> String {
	let mut out = String::with_capacity(vec.len() * 8);
	out.push('[');
	for (i, value) in vec.iter().enumerate() {
		if i > 0 {
			out.push(',');
		}
		out.push_str(&value.to_string());
	}
	out.push(']');
	out
}

#[cfg(test)]
mod tests {
	use super::vector_to_pg;

	#[test]
	fn formats_bracketed_csv() {
		assert_eq!(vector_to_pg(&[0.5, -1.0, 2.25]), "[0.5,-1,2.25]");
		assert_eq!(vector_to_pg(&[]), "[]");
	}
}
