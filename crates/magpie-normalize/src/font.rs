//! Font-family canonicalization.
//!
//! [CSS Fonts Level 4](https://www.w3.org/TR/css-fonts-4/#font-family-prop)
//!
//! `font-family` lists are compared as strings, so quoting style, casing,
//! and spacing must not produce false diffs: `'Arial',sans-serif` and
//! `arial, SANS-SERIF` name the same stack.

/// [§ 2.1.1 Generic font families](https://www.w3.org/TR/css-fonts-4/#generic-font-families)
///
/// Generic family keywords are always written lowercase in canonical form.
const GENERIC_FAMILIES: [&str; 10] = [
    "serif",
    "sans-serif",
    "monospace",
    "cursive",
    "fantasy",
    "system-ui",
    "ui-serif",
    "ui-sans-serif",
    "ui-monospace",
    "ui-rounded",
];

/// Families whose canonical capitalization is not plain Title Case.
///
/// Matched case-insensitively; first column is the lowercased key.
const FAMILY_ALIASES: [(&str, &str); 14] = [
    ("segoe ui", "Segoe UI"),
    ("trebuchet ms", "Trebuchet MS"),
    ("comic sans ms", "Comic Sans MS"),
    ("ms gothic", "MS Gothic"),
    ("ms sans serif", "MS Sans Serif"),
    ("pt sans", "PT Sans"),
    ("pt serif", "PT Serif"),
    ("pt mono", "PT Mono"),
    ("sf pro", "SF Pro"),
    ("sf pro text", "SF Pro Text"),
    ("sf pro display", "SF Pro Display"),
    ("sf mono", "SF Mono"),
    ("ibm plex sans", "IBM Plex Sans"),
    ("ibm plex mono", "IBM Plex Mono"),
];

/// Canonicalize a `font-family` value.
///
/// Faces are split on commas, trimmed, unquoted; generic families are
/// lowercased, known aliases take their canonical capitalization, and
/// anything else is Title-Cased word by word. Faces rejoin with `", "`.
pub fn normalize_font_family(value: &str) -> String {
    let faces: Vec<String> = value
        .split(',')
        .map(str::trim)
        .filter(|face| !face.is_empty())
        .map(canonical_face)
        .collect();
    if faces.is_empty() {
        return value.to_owned();
    }
    faces.join(", ")
}

fn canonical_face(face: &str) -> String {
    let unquoted = strip_quotes(face);
    let lower = unquoted.to_ascii_lowercase();
    if GENERIC_FAMILIES.contains(&lower.as_str()) {
        return lower;
    }
    if let Some((_, canonical)) = FAMILY_ALIASES.iter().find(|(key, _)| *key == lower) {
        return (*canonical).to_owned();
    }
    title_case(&unquoted)
}

/// Remove one matching pair of surrounding single or double quotes.
fn strip_quotes(face: &str) -> String {
    let face = face.trim();
    let stripped = face
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .or_else(|| face.strip_prefix('\'').and_then(|rest| rest.strip_suffix('\'')));
    stripped.unwrap_or(face).trim().to_owned()
}

/// Uppercase the first letter of each whitespace-separated word, lowercase
/// the rest: `times new roman` becomes `Times New Roman`.
fn title_case(name: &str) -> String {
    name.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
            })
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quotes_stripped_and_spacing_canonical() {
        assert_eq!(normalize_font_family("'Arial',sans-serif"), "Arial, sans-serif");
        assert_eq!(normalize_font_family("\"Times New Roman\" , serif"), "Times New Roman, serif");
    }

    #[test]
    fn generics_lowercased() {
        assert_eq!(normalize_font_family("SANS-SERIF"), "sans-serif");
        assert_eq!(normalize_font_family("System-UI"), "system-ui");
        assert_eq!(normalize_font_family("Monospace"), "monospace");
    }

    #[test]
    fn aliases_take_canonical_case() {
        assert_eq!(normalize_font_family("segoe ui, arial"), "Segoe UI, Arial");
        assert_eq!(normalize_font_family("'COMIC SANS MS'"), "Comic Sans MS");
        assert_eq!(normalize_font_family("ibm plex mono, monospace"), "IBM Plex Mono, monospace");
    }

    #[test]
    fn unknown_names_title_cased() {
        assert_eq!(normalize_font_family("times new roman"), "Times New Roman");
        assert_eq!(normalize_font_family("HELVETICA NEUE"), "Helvetica Neue");
    }

    #[test]
    fn spelling_variants_converge() {
        let a = normalize_font_family("'Helvetica Neue', Arial, sans-serif");
        let b = normalize_font_family("helvetica neue,ARIAL,  Sans-Serif");
        assert_eq!(a, b);
    }

    #[test]
    fn empty_value_unchanged() {
        assert_eq!(normalize_font_family(""), "");
        assert_eq!(normalize_font_family(" , "), " , ");
    }
}
