use imageverse::color::{Hsl, hex_to_hsl, hsl_to_hex};

fn parse_hsl(text: &str) -> (i32, i32, i32) {
    let hsl: Hsl = text.parse().expect("hsl text");
    (
        i32::from(hsl.hue),
        i32::from(hsl.saturation),
        i32::from(hsl.lightness),
    )
}

fn channels(hex: &str) -> [i32; 3] {
    let value = i32::from_str_radix(hex.trim_start_matches('#'), 16).expect("hex digits");
    [(value >> 16) & 0xff, (value >> 8) & 0xff, value & 0xff]
}

fn hue_distance(a: i32, b: i32) -> i32 {
    let diff = (a - b).rem_euclid(360);
    diff.min(360 - diff)
}

#[test]
fn vivid_hsl_survives_a_trip_through_hex() {
    for hue in (0..360).step_by(7) {
        for saturation in [80, 90, 100] {
            for lightness in (35..=65).step_by(5) {
                let original = format!("{hue} {saturation}% {lightness}%");
                let hex = hsl_to_hex(&original);
                let (h, s, l) = parse_hsl(&hex_to_hsl(&hex));
                assert!(
                    hue_distance(h, hue) <= 1,
                    "{original} -> {hex} -> hue {h}"
                );
                assert!((s - saturation).abs() <= 1, "{original} -> {hex} -> s {s}");
                assert!((l - lightness).abs() <= 1, "{original} -> {hex} -> l {l}");
            }
        }
    }
}

// Whole-number HSL cannot hold every hex color: about a third of random
// colors come back one or more steps off in some channel. These do not.
#[test]
fn common_hex_colors_survive_a_trip_through_hsl() {
    for hex in [
        "#000000", "#ffffff", "#808080", "#ff0000", "#00ff00", "#0000ff", "#ffff00", "#00ffff",
        "#ff00ff", "#000080", "#336699",
    ] {
        let back = hsl_to_hex(&hex_to_hsl(hex));
        let expected = channels(hex);
        let actual = channels(&back);
        for (want, got) in expected.iter().zip(actual.iter()) {
            assert!((want - got).abs() <= 1, "{hex} came back as {back}");
        }
    }
}

#[test]
fn grey_is_a_fixed_point() {
    assert_eq!(hsl_to_hex("0 0% 50%"), "#808080");
    assert_eq!(hex_to_hsl("#808080"), "0 0% 50%");
}

#[test]
fn empty_input_means_white() {
    assert_eq!(hex_to_hsl(""), "0 0% 100%");
    assert_eq!(hsl_to_hex(""), "#ffffff");
}

#[test]
fn output_is_lowercase_six_digit_hex() {
    for input in ["210 50% 40%", "300 100% 50%", "45 7% 93%"] {
        let hex = hsl_to_hex(input);
        assert_eq!(hex.len(), 7, "{hex}");
        assert!(hex.starts_with('#'));
        assert!(
            hex[1..]
                .chars()
                .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)),
            "{hex}"
        );
    }
}
