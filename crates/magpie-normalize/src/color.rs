//! CSS color canonicalization.
//!
//! [CSS Color Level 4](https://www.w3.org/TR/css-color-4/)
//!
//! Every parseable color form (named, hex, `rgb()`, `rgba()`, `hsl()`,
//! `hsla()`) is reduced to one canonical string, `rgba(r, g, b, a)`, so the
//! differ can compare colors that were merely spelled differently. Keyword
//! values that cannot be resolved without a cascade (`currentcolor`,
//! `inherit`, ...) pass through untouched.

use std::fmt;

/// sRGB color with an alpha channel.
///
/// [§ 4 Color syntax](https://www.w3.org/TR/css-color-4/#color-syntax)
/// Channels are 0-255; alpha stays fractional (0.0-1.0) because tolerance
/// checks compare it directly against the configured opacity tolerance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    /// Red channel (0-255).
    pub r: u8,
    /// Green channel (0-255).
    pub g: u8,
    /// Blue channel (0-255).
    pub b: u8,
    /// Alpha (0.0-1.0).
    pub a: f64,
}

impl Rgba {
    /// Fully transparent black, the canonical form of `transparent`.
    ///
    /// [§ 6.1](https://www.w3.org/TR/css-color-4/#transparent-color)
    pub const TRANSPARENT: Self = Self { r: 0, g: 0, b: 0, a: 0.0 };

    /// Parse any supported color form.
    ///
    /// Accepts named colors, `transparent`, 3/4/6/8-digit hex, and the
    /// `rgb()`/`rgba()`/`hsl()`/`hsla()` functions in both legacy
    /// (comma-separated) and modern (space-separated, `/ alpha`) syntax.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if value.is_empty() {
            return None;
        }
        if value.eq_ignore_ascii_case("transparent") {
            return Some(Self::TRANSPARENT);
        }
        if let Some(hex) = value.strip_prefix('#') {
            return Self::from_hex(hex);
        }
        let lower = value.to_ascii_lowercase();
        if let Some(args) = function_args(&lower, &["rgba", "rgb"]) {
            return parse_rgb_args(&args);
        }
        if let Some(args) = function_args(&lower, &["hsla", "hsl"]) {
            return parse_hsl_args(&args);
        }
        named_color(&lower).map(|(r, g, b)| Self { r, g, b, a: 1.0 })
    }

    /// [§ 4.2 The RGB hexadecimal notations](https://www.w3.org/TR/css-color-4/#hex-notation)
    ///
    /// "The syntax of a <hex-color> is a <hash-token> token whose value
    /// consists of 3, 4, 6, or 8 hexadecimal digits."
    ///
    /// Hex alpha is rounded to 2 decimals so `#80` and `#7f` stay distinct
    /// but the canonical string stays short.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        let channel_pair = |range: std::ops::Range<usize>| u8::from_str_radix(&hex[range], 16).ok();
        // "The three-digit RGB notation (#RGB) is converted into six-digit
        // form (#RRGGBB) by replicating digits, not by adding zeros."
        let channel_single =
            |index: usize| u8::from_str_radix(&hex[index..=index].repeat(2), 16).ok();
        match hex.len() {
            3 | 4 => {
                let r = channel_single(0)?;
                let g = channel_single(1)?;
                let b = channel_single(2)?;
                let a = if hex.len() == 4 {
                    round2(f64::from(channel_single(3)?) / 255.0)
                } else {
                    1.0
                };
                Some(Self { r, g, b, a })
            }
            6 | 8 => {
                let r = channel_pair(0..2)?;
                let g = channel_pair(2..4)?;
                let b = channel_pair(4..6)?;
                let a = if hex.len() == 8 {
                    round2(f64::from(channel_pair(6..8)?) / 255.0)
                } else {
                    1.0
                };
                Some(Self { r, g, b, a })
            }
            _ => None,
        }
    }

    /// [sRGB relative luminance](https://www.w3.org/TR/WCAG21/#dfn-relative-luminance)
    ///
    /// Standard coefficients 0.2126 / 0.7152 / 0.0722 over linearized sRGB
    /// channels. Used by severity analysis to judge perceptual impact.
    pub fn relative_luminance(&self) -> f64 {
        fn linearize(channel: u8) -> f64 {
            let c = f64::from(channel) / 255.0;
            if c <= 0.039_28 { c / 12.92 } else { ((c + 0.055) / 1.055).powf(2.4) }
        }
        0.2126 * linearize(self.r) + 0.7152 * linearize(self.g) + 0.0722 * linearize(self.b)
    }
}

impl fmt::Display for Rgba {
    /// Canonical form: `rgba(<int>, <int>, <int>, <number>)`, one space
    /// after each comma. Alpha prints `1` when opaque, otherwise up to two
    /// decimals with trailing zeros trimmed.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rgba({}, {}, {}, {})", self.r, self.g, self.b, format_alpha(self.a))
    }
}

/// Keywords a context-free normalizer must leave alone.
///
/// [§ 7.1 currentcolor](https://www.w3.org/TR/css-color-4/#currentcolor-color)
/// and the CSS-wide keywords; all resolve through the cascade, which the
/// comparison core does not run.
const PASS_THROUGH_KEYWORDS: [&str; 5] = ["currentcolor", "inherit", "initial", "unset", "revert"];

/// True if `value` is a keyword the color normalizer passes through.
pub fn is_pass_through_keyword(value: &str) -> bool {
    PASS_THROUGH_KEYWORDS.iter().any(|k| value.eq_ignore_ascii_case(k))
}

/// Canonicalize one color value.
///
/// Pass-through keywords return verbatim; parse failures also return the
/// input so a malformed value still diffs by plain string inequality.
pub fn normalize_color(value: &str) -> String {
    let trimmed = value.trim();
    if is_pass_through_keyword(trimmed) {
        return trimmed.to_owned();
    }
    Rgba::parse(trimmed).map_or_else(|| value.to_owned(), |rgba| rgba.to_string())
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn format_alpha(alpha: f64) -> String {
    let rounded = round2(alpha.clamp(0.0, 1.0));
    if (rounded - rounded.round()).abs() < f64::EPSILON {
        format!("{}", rounded.round() as i64)
    } else {
        let s = format!("{rounded:.2}");
        s.trim_end_matches('0').trim_end_matches('.').to_owned()
    }
}

/// Strip `name(` ... `)` and return the argument text, trying each alias
/// longest-first (`rgba` before `rgb`).
fn function_args(value: &str, names: &[&str]) -> Option<String> {
    for name in names {
        if let Some(rest) = value.strip_prefix(name) {
            let rest = rest.trim_start();
            if let Some(inner) = rest.strip_prefix('(') {
                return inner.strip_suffix(')').map(str::trim).map(str::to_owned);
            }
        }
    }
    None
}

/// A color function argument: plain number or percentage.
#[derive(Debug, Clone, Copy)]
enum ColorArg {
    Number(f64),
    Percentage(f64),
}

/// Tokenize function arguments, accepting both legacy comma syntax and the
/// modern space-separated syntax with `/ alpha`.
fn extract_args(args: &str) -> Vec<ColorArg> {
    args.split(|c: char| c == ',' || c == '/' || c.is_whitespace())
        .filter(|token| !token.is_empty())
        .filter_map(|token| {
            let token = token.trim_end_matches("deg");
            if let Some(percent) = token.strip_suffix('%') {
                percent.parse().ok().map(ColorArg::Percentage)
            } else {
                token.parse().ok().map(ColorArg::Number)
            }
        })
        .collect()
}

/// [§ 4.1 The RGB Functions](https://www.w3.org/TR/css-color-4/#rgb-functions)
///
/// "Values outside these ranges are not invalid, but are clamped to the
/// ranges defined here at parsed-value time."
fn parse_rgb_args(args: &str) -> Option<Rgba> {
    let vals = extract_args(args);
    if vals.len() < 3 {
        return None;
    }
    let channel = |arg: ColorArg| {
        let v = match arg {
            ColorArg::Number(n) => n,
            // "100% = 255"
            ColorArg::Percentage(p) => p * 255.0 / 100.0,
        };
        v.round().clamp(0.0, 255.0) as u8
    };
    // "If omitted, it defaults to 100%."
    let a = vals.get(3).map_or(1.0, |&arg| alpha_value(arg));
    Some(Rgba { r: channel(vals[0]), g: channel(vals[1]), b: channel(vals[2]), a })
}

/// [§ 4.1 The HSL Functions](https://www.w3.org/TR/css-color-4/#the-hsl-notation)
///
/// "<hue> is a <number> or <angle>, interpreted as degrees."
fn parse_hsl_args(args: &str) -> Option<Rgba> {
    let vals = extract_args(args);
    if vals.len() < 3 {
        return None;
    }
    let hue = match vals[0] {
        ColorArg::Number(v) => v,
        ColorArg::Percentage(v) => v * 3.6,
    };
    let percent = |arg: ColorArg| {
        let v = match arg {
            ColorArg::Number(v) | ColorArg::Percentage(v) => v,
        };
        v.clamp(0.0, 100.0) / 100.0
    };
    let a = vals.get(3).map_or(1.0, |&arg| alpha_value(arg));
    let (r, g, b) = hsl_to_rgb(hue, percent(vals[1]), percent(vals[2]));
    Some(Rgba { r, g, b, a })
}

/// "<alpha-value> can be a <number> (clamped to [0, 1]) or a <percentage>."
fn alpha_value(arg: ColorArg) -> f64 {
    match arg {
        ColorArg::Number(n) => n.clamp(0.0, 1.0),
        ColorArg::Percentage(p) => (p / 100.0).clamp(0.0, 1.0),
    }
}

/// [§ 4.2.4 HSL-to-RGB](https://www.w3.org/TR/css-color-4/#hsl-to-rgb)
///
/// Hue wraps mod 360; saturation and lightness arrive pre-clamped to 0-1.
/// Standard chroma/intermediate algorithm.
fn hsl_to_rgb(hue: f64, saturation: f64, lightness: f64) -> (u8, u8, u8) {
    let h = ((hue % 360.0) + 360.0) % 360.0;
    let c = (1.0 - (2.0 * lightness - 1.0).abs()) * saturation;
    let h_prime = h / 60.0;
    let x = c * (1.0 - (h_prime % 2.0 - 1.0).abs());

    let (r1, g1, b1) = match h_prime as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        5 => (c, 0.0, x),
        _ => (0.0, 0.0, 0.0),
    };

    let m = lightness - c / 2.0;
    let to_u8 = |v: f64| ((v + m) * 255.0).round().clamp(0.0, 255.0) as u8;
    (to_u8(r1), to_u8(g1), to_u8(b1))
}

/// [§ 6.1 Named Colors](https://www.w3.org/TR/css-color-4/#named-colors)
///
/// The full named-color table (alias spellings like `grey` included).
/// `transparent` is handled separately since it is the only keyword with
/// alpha zero.
fn named_color(name: &str) -> Option<(u8, u8, u8)> {
    const NAMED: &[(&str, u32)] = &[
        ("aliceblue", 0xf0f8ff),
        ("antiquewhite", 0xfaebd7),
        ("aqua", 0x00ffff),
        ("aquamarine", 0x7fffd4),
        ("azure", 0xf0ffff),
        ("beige", 0xf5f5dc),
        ("bisque", 0xffe4c4),
        ("black", 0x000000),
        ("blanchedalmond", 0xffebcd),
        ("blue", 0x0000ff),
        ("blueviolet", 0x8a2be2),
        ("brown", 0xa52a2a),
        ("burlywood", 0xdeb887),
        ("cadetblue", 0x5f9ea0),
        ("chartreuse", 0x7fff00),
        ("chocolate", 0xd2691e),
        ("coral", 0xff7f50),
        ("cornflowerblue", 0x6495ed),
        ("cornsilk", 0xfff8dc),
        ("crimson", 0xdc143c),
        ("cyan", 0x00ffff),
        ("darkblue", 0x00008b),
        ("darkcyan", 0x008b8b),
        ("darkgoldenrod", 0xb8860b),
        ("darkgray", 0xa9a9a9),
        ("darkgreen", 0x006400),
        ("darkgrey", 0xa9a9a9),
        ("darkkhaki", 0xbdb76b),
        ("darkmagenta", 0x8b008b),
        ("darkolivegreen", 0x556b2f),
        ("darkorange", 0xff8c00),
        ("darkorchid", 0x9932cc),
        ("darkred", 0x8b0000),
        ("darksalmon", 0xe9967a),
        ("darkseagreen", 0x8fbc8f),
        ("darkslateblue", 0x483d8b),
        ("darkslategray", 0x2f4f4f),
        ("darkslategrey", 0x2f4f4f),
        ("darkturquoise", 0x00ced1),
        ("darkviolet", 0x9400d3),
        ("deeppink", 0xff1493),
        ("deepskyblue", 0x00bfff),
        ("dimgray", 0x696969),
        ("dimgrey", 0x696969),
        ("dodgerblue", 0x1e90ff),
        ("firebrick", 0xb22222),
        ("floralwhite", 0xfffaf0),
        ("forestgreen", 0x228b22),
        ("fuchsia", 0xff00ff),
        ("gainsboro", 0xdcdcdc),
        ("ghostwhite", 0xf8f8ff),
        ("gold", 0xffd700),
        ("goldenrod", 0xdaa520),
        ("gray", 0x808080),
        ("green", 0x008000),
        ("greenyellow", 0xadff2f),
        ("grey", 0x808080),
        ("honeydew", 0xf0fff0),
        ("hotpink", 0xff69b4),
        ("indianred", 0xcd5c5c),
        ("indigo", 0x4b0082),
        ("ivory", 0xfffff0),
        ("khaki", 0xf0e68c),
        ("lavender", 0xe6e6fa),
        ("lavenderblush", 0xfff0f5),
        ("lawngreen", 0x7cfc00),
        ("lemonchiffon", 0xfffacd),
        ("lightblue", 0xadd8e6),
        ("lightcoral", 0xf08080),
        ("lightcyan", 0xe0ffff),
        ("lightgoldenrodyellow", 0xfafad2),
        ("lightgray", 0xd3d3d3),
        ("lightgreen", 0x90ee90),
        ("lightgrey", 0xd3d3d3),
        ("lightpink", 0xffb6c1),
        ("lightsalmon", 0xffa07a),
        ("lightseagreen", 0x20b2aa),
        ("lightskyblue", 0x87cefa),
        ("lightslategray", 0x778899),
        ("lightslategrey", 0x778899),
        ("lightsteelblue", 0xb0c4de),
        ("lightyellow", 0xffffe0),
        ("lime", 0x00ff00),
        ("limegreen", 0x32cd32),
        ("linen", 0xfaf0e6),
        ("magenta", 0xff00ff),
        ("maroon", 0x800000),
        ("mediumaquamarine", 0x66cdaa),
        ("mediumblue", 0x0000cd),
        ("mediumorchid", 0xba55d3),
        ("mediumpurple", 0x9370db),
        ("mediumseagreen", 0x3cb371),
        ("mediumslateblue", 0x7b68ee),
        ("mediumspringgreen", 0x00fa9a),
        ("mediumturquoise", 0x48d1cc),
        ("mediumvioletred", 0xc71585),
        ("midnightblue", 0x191970),
        ("mintcream", 0xf5fffa),
        ("mistyrose", 0xffe4e1),
        ("moccasin", 0xffe4b5),
        ("navajowhite", 0xffdead),
        ("navy", 0x000080),
        ("oldlace", 0xfdf5e6),
        ("olive", 0x808000),
        ("olivedrab", 0x6b8e23),
        ("orange", 0xffa500),
        ("orangered", 0xff4500),
        ("orchid", 0xda70d6),
        ("palegoldenrod", 0xeee8aa),
        ("palegreen", 0x98fb98),
        ("paleturquoise", 0xafeeee),
        ("palevioletred", 0xdb7093),
        ("papayawhip", 0xffefd5),
        ("peachpuff", 0xffdab9),
        ("peru", 0xcd853f),
        ("pink", 0xffc0cb),
        ("plum", 0xdda0dd),
        ("powderblue", 0xb0e0e6),
        ("purple", 0x800080),
        ("rebeccapurple", 0x663399),
        ("red", 0xff0000),
        ("rosybrown", 0xbc8f8f),
        ("royalblue", 0x4169e1),
        ("saddlebrown", 0x8b4513),
        ("salmon", 0xfa8072),
        ("sandybrown", 0xf4a460),
        ("seagreen", 0x2e8b57),
        ("seashell", 0xfff5ee),
        ("sienna", 0xa0522d),
        ("silver", 0xc0c0c0),
        ("skyblue", 0x87ceeb),
        ("slateblue", 0x6a5acd),
        ("slategray", 0x708090),
        ("slategrey", 0x708090),
        ("snow", 0xfffafa),
        ("springgreen", 0x00ff7f),
        ("steelblue", 0x4682b4),
        ("tan", 0xd2b48c),
        ("teal", 0x008080),
        ("thistle", 0xd8bfd8),
        ("tomato", 0xff6347),
        ("turquoise", 0x40e0d0),
        ("violet", 0xee82ee),
        ("wheat", 0xf5deb3),
        ("white", 0xffffff),
        ("whitesmoke", 0xf5f5f5),
        ("yellow", 0xffff00),
        ("yellowgreen", 0x9acd32),
    ];
    NAMED
        .binary_search_by(|(n, _)| n.cmp(&name))
        .ok()
        .map(|i| NAMED[i].1)
        .map(|hex| ((hex >> 16) as u8, (hex >> 8) as u8, hex as u8))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_forms() {
        assert_eq!(Rgba::parse("#f00").unwrap(), Rgba { r: 255, g: 0, b: 0, a: 1.0 });
        assert_eq!(Rgba::parse("#FF0000").unwrap(), Rgba { r: 255, g: 0, b: 0, a: 1.0 });
        assert_eq!(Rgba::parse("#ff000080").unwrap().a, 0.5);
        assert_eq!(Rgba::parse("#f008").unwrap().a, 0.53);
        assert!(Rgba::parse("#ff00").is_some());
        assert!(Rgba::parse("#ff0zz0").is_none());
    }

    #[test]
    fn named_and_hex_agree() {
        // Hex and named spellings must canonicalize identically.
        assert_eq!(normalize_color("#ff0000"), "rgba(255, 0, 0, 1)");
        assert_eq!(normalize_color("red"), "rgba(255, 0, 0, 1)");
        assert_eq!(normalize_color("rebeccapurple"), "rgba(102, 51, 153, 1)");
        assert_eq!(normalize_color("Grey"), "rgba(128, 128, 128, 1)");
    }

    #[test]
    fn transparent_is_zero_alpha_black() {
        assert_eq!(normalize_color("transparent"), "rgba(0, 0, 0, 0)");
    }

    #[test]
    fn rgb_function_whitespace_standardized() {
        assert_eq!(normalize_color("rgb(255,0,0)"), "rgba(255, 0, 0, 1)");
        assert_eq!(normalize_color("rgb( 255 , 0 , 0 )"), "rgba(255, 0, 0, 1)");
        assert_eq!(normalize_color("rgb(255 0 0 / 0.5)"), "rgba(255, 0, 0, 0.5)");
        assert_eq!(normalize_color("rgba(10, 20, 30, 0.25)"), "rgba(10, 20, 30, 0.25)");
        assert_eq!(normalize_color("rgb(100%, 0%, 50%)"), "rgba(255, 0, 128, 1)");
    }

    #[test]
    fn rgb_channels_clamped() {
        assert_eq!(normalize_color("rgb(300, -5, 128)"), "rgba(255, 0, 128, 1)");
    }

    #[test]
    fn hsl_conversion() {
        assert_eq!(normalize_color("hsl(0, 100%, 50%)"), "rgba(255, 0, 0, 1)");
        assert_eq!(normalize_color("hsl(120, 100%, 50%)"), "rgba(0, 255, 0, 1)");
        assert_eq!(normalize_color("hsl(240, 100%, 50%)"), "rgba(0, 0, 255, 1)");
        // Hue wraps mod 360.
        assert_eq!(normalize_color("hsl(480, 100%, 50%)"), normalize_color("hsl(120, 100%, 50%)"));
        assert_eq!(normalize_color("hsla(0, 100%, 50%, 0.3)"), "rgba(255, 0, 0, 0.3)");
        // Saturation/lightness clamped to 0-100.
        assert_eq!(normalize_color("hsl(0, 150%, 50%)"), "rgba(255, 0, 0, 1)");
    }

    #[test]
    fn pass_through_keywords_untouched() {
        assert_eq!(normalize_color("currentcolor"), "currentcolor");
        assert_eq!(normalize_color("inherit"), "inherit");
        assert_eq!(normalize_color("not-a-color"), "not-a-color");
    }

    #[test]
    fn luminance_endpoints() {
        let white = Rgba { r: 255, g: 255, b: 255, a: 1.0 };
        let black = Rgba { r: 0, g: 0, b: 0, a: 1.0 };
        assert!((white.relative_luminance() - 1.0).abs() < 1e-6);
        assert!(black.relative_luminance().abs() < 1e-6);
        // Red sits near 0.2126 by construction of the coefficients.
        let red = Rgba { r: 255, g: 0, b: 0, a: 1.0 };
        assert!((red.relative_luminance() - 0.2126).abs() < 1e-4);
    }

    #[test]
    fn named_table_is_sorted_for_binary_search() {
        let mut names: Vec<&str> = Vec::new();
        for probe in ["aliceblue", "yellowgreen", "navy", "slategrey"] {
            assert!(named_color(probe).is_some(), "missing {probe}");
            names.push(probe);
        }
        assert!(named_color("notacolor").is_none());
    }
}
