/// Extracts the first balanced JSON object from a model response.
///
/// Models wrap JSON in prose or markdown fences even when asked not to.
/// Returns `None` when no `{` is present or the object is never closed.
pub fn extract_json(response: &str) -> Option<&str> {
    let start = response.find('{')?;

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, c) in response[start..].char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }

        match c {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&response[start..start + i + 1]);
                }
            }
            _ => {}
        }
    }

    None
}
