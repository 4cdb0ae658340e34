//! CSS shorthand expansion.
//!
//! [CSS Cascading and Inheritance](https://www.w3.org/TR/css-cascade-5/#shorthand)
//!
//! Computed-style dumps from different browsers disagree on whether
//! shorthands appear alongside their longhands. Expanding the common
//! shorthands first means the differ always compares longhand against
//! longhand. Expansion is best-effort: anything that does not parse leaves
//! the mapping exactly as it came in.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;

/// Style mapping, property name to raw value.
pub type StyleMap = BTreeMap<String, String>;

/// [§ 2.5 Border shorthand](https://www.w3.org/TR/css-backgrounds-3/#the-border-shorthands)
/// line styles a border token can be.
const BORDER_STYLES: [&str; 10] =
    ["none", "hidden", "dotted", "dashed", "solid", "double", "groove", "ridge", "inset", "outset"];

/// Font shorthand weight vocabulary (keywords plus the numeric scale).
const FONT_WEIGHTS: [&str; 13] = [
    "normal", "bold", "bolder", "lighter", "100", "200", "300", "400", "500", "600", "700", "800",
    "900",
];

/// Font shorthand style vocabulary.
const FONT_STYLES: [&str; 2] = ["italic", "oblique"];

/// Font shorthand variant vocabulary.
const FONT_VARIANTS: [&str; 1] = ["small-caps"];

fn border_width_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\d+(\.\d+)?(px|em|rem|pt|%)$").unwrap_or_else(|_| unreachable!())
    })
}

fn font_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        // size, optional /line-height, then the mandatory family tail.
        Regex::new(r"(?i)(\d+(?:\.\d+)?(?:px|em|rem|pt|%|vh|vw))(?:\s*/\s*([\w.%-]+))?\s+(.+)$")
            .unwrap_or_else(|_| unreachable!())
    })
}

/// Expand the supported shorthands (`margin`, `padding`, `border`, `font`,
/// `background`) into their longhands.
///
/// Returns a new mapping; the input is never mutated. Any individual
/// shorthand that fails to parse is kept as-is.
pub fn expand_shorthands(styles: &StyleMap) -> StyleMap {
    let mut expanded = styles.clone();
    expand_box_shorthand(&mut expanded, "margin");
    expand_box_shorthand(&mut expanded, "padding");
    expand_border(&mut expanded);
    expand_font(&mut expanded);
    expand_background(&mut expanded);
    expanded
}

/// [§ 8.3 Margin properties](https://www.w3.org/TR/CSS2/box.html#margin-properties)
///
/// 1/2/3/4-value box expansion: `10px` fills all sides, `10px 20px` is
/// vertical/horizontal, and so on. Skipped when any longhand is already
/// present, since the longhand is the more specific signal.
fn expand_box_shorthand(styles: &mut StyleMap, base: &str) {
    let sides = ["top", "right", "bottom", "left"];
    if sides.iter().any(|side| styles.contains_key(&format!("{base}-{side}"))) {
        return;
    }
    let Some(value) = styles.get(base).cloned() else { return };
    let tokens: Vec<&str> = value.split_whitespace().collect();
    let (top, right, bottom, left) = match tokens.as_slice() {
        [all] => (*all, *all, *all, *all),
        [vertical, horizontal] => (*vertical, *horizontal, *vertical, *horizontal),
        [top, horizontal, bottom] => (*top, *horizontal, *bottom, *horizontal),
        [top, right, bottom, left] => (*top, *right, *bottom, *left),
        _ => return,
    };
    styles.remove(base);
    for (side, side_value) in sides.iter().zip([top, right, bottom, left]) {
        styles.insert(format!("{base}-{side}"), side_value.to_owned());
    }
}

/// Split `border: 1px solid red` into width/style/color by token shape:
/// a dimension is the width, a line-style keyword is the style, anything
/// else is the color.
fn expand_border(styles: &mut StyleMap) {
    let Some(value) = styles.get("border").cloned() else { return };
    let mut width = None;
    let mut style = None;
    let mut color_tokens = Vec::new();
    for token in value.split_whitespace() {
        let lower = token.to_ascii_lowercase();
        if width.is_none() && border_width_pattern().is_match(&lower) {
            width = Some(token.to_owned());
        } else if style.is_none() && BORDER_STYLES.contains(&lower.as_str()) {
            style = Some(lower);
        } else {
            color_tokens.push(token.to_owned());
        }
    }
    if width.is_none() && style.is_none() && color_tokens.is_empty() {
        return;
    }
    styles.remove("border");
    if let Some(width) = width {
        styles.entry("border-width".to_owned()).or_insert(width);
    }
    if let Some(style) = style {
        styles.entry("border-style".to_owned()).or_insert(style);
    }
    if !color_tokens.is_empty() {
        // Color functions contain spaces; rejoin what was split.
        styles.entry("border-color".to_owned()).or_insert_with(|| color_tokens.join(" "));
    }
}

/// [§ 4.8 Font shorthand](https://www.w3.org/TR/css-fonts-4/#font-prop)
///
/// `font: italic bold 12px/1.5 Arial, sans-serif` — the size (with optional
/// `/line-height`) and family tail are mandatory; tokens before the size
/// are classified against fixed weight/style/variant vocabularies.
fn expand_font(styles: &mut StyleMap) {
    let Some(value) = styles.get("font").cloned() else { return };
    let Some(captures) = font_pattern().captures(&value) else { return };
    let Some(size) = captures.get(1) else { return };
    let Some(family) = captures.get(3) else { return };

    let prefix = &value[..size.start()];
    let mut weight = None;
    let mut font_style = None;
    let mut variant = None;
    for token in prefix.split_whitespace() {
        let lower = token.to_ascii_lowercase();
        if FONT_STYLES.contains(&lower.as_str()) {
            font_style.get_or_insert(lower);
        } else if FONT_VARIANTS.contains(&lower.as_str()) {
            variant.get_or_insert(lower);
        } else if FONT_WEIGHTS.contains(&lower.as_str()) {
            weight.get_or_insert(lower);
        }
        // "normal" resets all three; ignoring it matches that meaning.
    }

    styles.remove("font");
    styles.entry("font-size".to_owned()).or_insert_with(|| size.as_str().to_owned());
    styles.entry("font-family".to_owned()).or_insert_with(|| family.as_str().to_owned());
    if let Some(line_height) = captures.get(2) {
        styles.entry("line-height".to_owned()).or_insert_with(|| line_height.as_str().to_owned());
    }
    if let Some(weight) = weight {
        styles.entry("font-weight".to_owned()).or_insert(weight);
    }
    if let Some(font_style) = font_style {
        styles.entry("font-style".to_owned()).or_insert(font_style);
    }
    if let Some(variant) = variant {
        styles.entry("font-variant".to_owned()).or_insert(variant);
    }
}

/// Pull a plain color out of `background`, leaving image/gradient
/// shorthands alone (their color position is ambiguous without a real
/// background parser).
fn expand_background(styles: &mut StyleMap) {
    let Some(value) = styles.get("background").cloned() else { return };
    let lower = value.to_ascii_lowercase();
    if lower.contains("url(") || lower.contains("gradient(") {
        return;
    }
    let Some(color) = extract_background_color(&value) else { return };
    styles.remove("background");
    styles.entry("background-color".to_owned()).or_insert(color);
}

fn extract_background_color(value: &str) -> Option<String> {
    static HEX: OnceLock<Regex> = OnceLock::new();
    static RGB: OnceLock<Regex> = OnceLock::new();
    static HSL: OnceLock<Regex> = OnceLock::new();
    let hex = HEX.get_or_init(|| {
        Regex::new(r"#[0-9a-fA-F]{3,8}").unwrap_or_else(|_| unreachable!())
    });
    let rgb = RGB.get_or_init(|| {
        Regex::new(r"rgba?\([^)]*\)").unwrap_or_else(|_| unreachable!())
    });
    let hsl = HSL.get_or_init(|| {
        Regex::new(r"hsla?\([^)]*\)").unwrap_or_else(|_| unreachable!())
    });
    if let Some(m) = hex.find(value) {
        return Some(m.as_str().to_owned());
    }
    if let Some(m) = rgb.find(value) {
        return Some(m.as_str().to_owned());
    }
    if let Some(m) = hsl.find(value) {
        return Some(m.as_str().to_owned());
    }
    value
        .split_whitespace()
        .find(|token| crate::color::Rgba::parse(token).is_some())
        .map(str::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn styles(pairs: &[(&str, &str)]) -> StyleMap {
        pairs.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())).collect()
    }

    #[test]
    fn margin_expansion_arities() {
        let one = expand_shorthands(&styles(&[("margin", "10px")]));
        assert_eq!(one.get("margin-top").unwrap(), "10px");
        assert_eq!(one.get("margin-left").unwrap(), "10px");
        assert!(!one.contains_key("margin"));

        let two = expand_shorthands(&styles(&[("margin", "10px 20px")]));
        assert_eq!(two.get("margin-top").unwrap(), "10px");
        assert_eq!(two.get("margin-right").unwrap(), "20px");
        assert_eq!(two.get("margin-bottom").unwrap(), "10px");
        assert_eq!(two.get("margin-left").unwrap(), "20px");

        let three = expand_shorthands(&styles(&[("padding", "1px 2px 3px")]));
        assert_eq!(three.get("padding-top").unwrap(), "1px");
        assert_eq!(three.get("padding-right").unwrap(), "2px");
        assert_eq!(three.get("padding-bottom").unwrap(), "3px");
        assert_eq!(three.get("padding-left").unwrap(), "2px");

        let four = expand_shorthands(&styles(&[("margin", "1px 2px 3px 4px")]));
        assert_eq!(four.get("margin-left").unwrap(), "4px");
    }

    #[test]
    fn margin_skipped_when_longhand_present() {
        let map = expand_shorthands(&styles(&[("margin", "10px"), ("margin-top", "99px")]));
        assert_eq!(map.get("margin").unwrap(), "10px");
        assert_eq!(map.get("margin-top").unwrap(), "99px");
        assert!(!map.contains_key("margin-left"));
    }

    #[test]
    fn border_token_classification() {
        let map = expand_shorthands(&styles(&[("border", "1px solid red")]));
        assert_eq!(map.get("border-width").unwrap(), "1px");
        assert_eq!(map.get("border-style").unwrap(), "solid");
        assert_eq!(map.get("border-color").unwrap(), "red");
        assert!(!map.contains_key("border"));

        // Order-free: style first, function color with spaces.
        let map = expand_shorthands(&styles(&[("border", "dashed rgb(0, 0, 0) 2.5px")]));
        assert_eq!(map.get("border-width").unwrap(), "2.5px");
        assert_eq!(map.get("border-style").unwrap(), "dashed");
        assert_eq!(map.get("border-color").unwrap(), "rgb(0, 0, 0)");
    }

    #[test]
    fn font_full_form() {
        let map =
            expand_shorthands(&styles(&[("font", "italic bold 12px/1.5 Arial, sans-serif")]));
        assert_eq!(map.get("font-size").unwrap(), "12px");
        assert_eq!(map.get("line-height").unwrap(), "1.5");
        assert_eq!(map.get("font-family").unwrap(), "Arial, sans-serif");
        assert_eq!(map.get("font-weight").unwrap(), "bold");
        assert_eq!(map.get("font-style").unwrap(), "italic");
        assert!(!map.contains_key("font"));
    }

    #[test]
    fn font_minimal_form() {
        let map = expand_shorthands(&styles(&[("font", "16px Georgia")]));
        assert_eq!(map.get("font-size").unwrap(), "16px");
        assert_eq!(map.get("font-family").unwrap(), "Georgia");
        assert!(!map.contains_key("font-weight"));
    }

    #[test]
    fn font_without_family_left_alone() {
        let map = expand_shorthands(&styles(&[("font", "12px")]));
        assert_eq!(map.get("font").unwrap(), "12px");
    }

    #[test]
    fn background_color_extraction() {
        let hex = expand_shorthands(&styles(&[("background", "#fff no-repeat")]));
        assert_eq!(hex.get("background-color").unwrap(), "#fff");
        assert!(!hex.contains_key("background"));

        let func = expand_shorthands(&styles(&[("background", "rgba(0, 0, 0, 0.5)")]));
        assert_eq!(func.get("background-color").unwrap(), "rgba(0, 0, 0, 0.5)");

        let named = expand_shorthands(&styles(&[("background", "red")]));
        assert_eq!(named.get("background-color").unwrap(), "red");
    }

    #[test]
    fn background_with_image_left_in_place() {
        let url = expand_shorthands(&styles(&[("background", "#fff url(bg.png) no-repeat")]));
        assert!(url.contains_key("background"));
        assert!(!url.contains_key("background-color"));

        let gradient =
            expand_shorthands(&styles(&[("background", "linear-gradient(red, blue)")]));
        assert!(gradient.contains_key("background"));
    }

    #[test]
    fn unrelated_properties_untouched() {
        let map = expand_shorthands(&styles(&[("color", "red"), ("display", "flex")]));
        assert_eq!(map.get("color").unwrap(), "red");
        assert_eq!(map.get("display").unwrap(), "flex");
    }
}
