//! Aspect ratio label normalization.

/// Code used when a label is not recognized.
pub const DEFAULT_ASPECT_RATIO: &str = "1:1";

// Longest codes first so "21:9" is not shadowed by a shorter match.
const KNOWN_CODES: [&str; 6] = ["21:9", "16:9", "9:16", "4:5", "3:2", "1:1"];

/// Maps a UI label such as `"Querformat (16:9)"` to its ratio code.
pub fn normalize_aspect_ratio(label: &str) -> &'static str {
    KNOWN_CODES
        .iter()
        .find(|code| label.contains(*code))
        .copied()
        .unwrap_or(DEFAULT_ASPECT_RATIO)
}

/// Natural-language ratio hint for prompt text.
pub fn describe_aspect_ratio(label: &str) -> String {
    let code = normalize_aspect_ratio(label);
    let shape = match code {
        "16:9" => "Wide",
        "9:16" => "Vertical",
        "21:9" => "Cinematic",
        "4:5" => "Portrait",
        "3:2" => "Classic",
        _ => "Square",
    };
    format!("Aspect Ratio: {code} ({shape})")
}

/// Video models only render landscape or portrait.
pub fn video_aspect_ratio(label: &str) -> &'static str {
    match normalize_aspect_ratio(label) {
        "9:16" | "4:5" => "9:16",
        _ => "16:9",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_labels_map_to_themselves() {
        for code in ["16:9", "9:16", "1:1", "21:9", "4:5", "3:2"] {
            assert_eq!(normalize_aspect_ratio(code), code);
        }
    }

    #[test]
    fn decorated_labels() {
        assert_eq!(normalize_aspect_ratio("Querformat (16:9)"), "16:9");
        assert_eq!(normalize_aspect_ratio("Hochformat (9:16)"), "9:16");
        assert_eq!(normalize_aspect_ratio("Cinematic (21:9)"), "21:9");
        assert_eq!(normalize_aspect_ratio("Quadrat (1:1)"), "1:1");
    }

    #[test]
    fn unknown_label_falls_back() {
        assert_eq!(normalize_aspect_ratio("panorama"), DEFAULT_ASPECT_RATIO);
        assert_eq!(normalize_aspect_ratio(""), "1:1");
    }

    #[test]
    fn descriptions() {
        assert_eq!(
            describe_aspect_ratio("Querformat (16:9)"),
            "Aspect Ratio: 16:9 (Wide)"
        );
        assert_eq!(describe_aspect_ratio("???"), "Aspect Ratio: 1:1 (Square)");
    }

    #[test]
    fn video_only_has_two_shapes() {
        assert_eq!(video_aspect_ratio("9:16"), "9:16");
        assert_eq!(video_aspect_ratio("21:9"), "16:9");
        assert_eq!(video_aspect_ratio("1:1"), "16:9");
    }
}
