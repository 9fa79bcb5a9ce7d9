//! Casing helpers for tag segments and default bundle filenames.

/// Converts an arbitrarily-cased string to one canonical MixedCase form.
///
/// Chunks are split at non-alphanumeric characters, each chunk gets an
/// uppercase first letter and lowercase remainder, and the chunks are
/// joined back without separators.
///
/// ```
/// use weld_cli::domain::inflection::mixed_case;
/// assert_eq!(mixed_case("core"), "Core");
/// assert_eq!(mixed_case("CORE"), "Core");
/// assert_eq!(mixed_case("native_hash"), "NativeHash");
/// ```
pub fn mixed_case(input: &str) -> String {
    input
        .split(|c: char| !c.is_alphanumeric())
        .filter(|chunk| !chunk.is_empty())
        .map(capitalize)
        .collect()
}

/// Converts a name to snake_case, mapping dots and spaces to underscores.
///
/// Used for the default bundle filename derived from a package name.
pub fn snake_case(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut prev_underscore = true;
    for c in input.chars() {
        if c.is_uppercase() {
            if !prev_underscore {
                result.push('_');
            }
            result.extend(c.to_lowercase());
            prev_underscore = false;
        } else if c == '.' || c == ' ' || c == '-' || c == '_' {
            if !prev_underscore {
                result.push('_');
            }
            prev_underscore = true;
        } else {
            result.push(c);
            prev_underscore = false;
        }
    }
    result.trim_end_matches('_').to_string()
}

fn capitalize(chunk: &str) -> String {
    let mut chars = chunk.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}
