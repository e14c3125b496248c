/// Display names offered to clients, keyed to ISO 639-1 codes.
pub const LANGUAGES: &[(&str, &str)] = &[
    ("Anglais", "en"),
    ("Francais", "fr"),
    ("Espagnol", "es"),
    ("Allemand", "de"),
    ("Italien", "it"),
    ("Japonais", "ja"),
    ("Chinois", "zh"),
];

pub fn display_name(code: &str) -> Option<&'static str> {
    LANGUAGES
        .iter()
        .find(|(_, c)| *c == code)
        .map(|(name, _)| *name)
}
