use rand::Rng;

pub fn random_color<R: Rng + ?Sized>(rng: &mut R) -> String {
    format!("#{:06x}", rng.gen_range(0..=0xff_ffffu32))
}

pub fn is_hex_color(value: &str) -> bool {
    let Some(digits) = value.strip_prefix('#') else { return false };
    digits.len() == 6 && digits.chars().all(|ch| ch.is_ascii_hexdigit())
}
