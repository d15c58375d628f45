//! Locale tags understood by the editor.
//!
//! Translated UI strings belong to the front end; the core only needs to know
//! which tags are valid, how to map an arbitrary system locale onto one of
//! them, and which ones are written right-to-left.

/// Supported languages: (tag, native_name)
pub const LANGUAGES: &[(&str, &str)] = &[
    ("en", "English"),
    ("zh-CN", "简体中文"),
    ("zh-HK", "繁體中文"),
    ("ja", "日本語"),
    ("ko", "한국어"),
    ("fr", "Français"),
    ("de", "Deutsch"),
    ("es", "Español"),
    ("pt-BR", "Português (Brasil)"),
    ("ru", "Русский"),
    ("ar", "العربية"),
];

pub const DEFAULT_LANGUAGE: &str = "en";

pub fn is_supported(tag: &str) -> bool {
    LANGUAGES.iter().any(|(code, _)| *code == tag)
}

pub fn native_name(tag: &str) -> Option<&'static str> {
    LANGUAGES.iter().find(|(code, _)| *code == tag).map(|(_, name)| *name)
}

/// Map any locale string (`en_US.UTF-8`, `zh-TW`, `pt`) onto a supported tag.
/// Unknown locales fall back to English.
pub fn detect_language(locale: &str) -> &'static str {
    // POSIX form: strip encoding and modifier, use '-' as separator
    let base = locale.split(['.', '@']).next().unwrap_or("");
    let tag = base.replace('_', "-").to_ascii_lowercase();

    if let Some(&(code, _)) = LANGUAGES.iter().find(|(code, _)| code.to_ascii_lowercase() == tag) {
        return code;
    }
    if tag == "zh-tw" || tag == "zh-hk" || tag == "zh-mo" || tag.starts_with("zh-hant") {
        return "zh-HK";
    }
    if tag.starts_with("zh") {
        return "zh-CN";
    }
    const PREFIXES: &[(&str, &str)] = &[
        ("ja", "ja"),
        ("ko", "ko"),
        ("fr", "fr"),
        ("de", "de"),
        ("es", "es"),
        ("pt", "pt-BR"),
        ("ru", "ru"),
        ("ar", "ar"),
    ];
    PREFIXES
        .iter()
        .find(|&&(prefix, _)| tag.starts_with(prefix))
        .map(|&(_, code)| code)
        .unwrap_or(DEFAULT_LANGUAGE)
}

/// Keep a supported tag as-is, otherwise run it through [`detect_language`].
pub fn normalize(tag: &str) -> String {
    if is_supported(tag) {
        tag.to_string()
    } else {
        detect_language(tag).to_string()
    }
}

/// Host language from `LC_ALL`, `LC_MESSAGES`, then `LANG`.
pub fn system_language() -> &'static str {
    ["LC_ALL", "LC_MESSAGES", "LANG"]
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .find(|v| !v.is_empty() && v != "C" && v != "POSIX")
        .map(|v| detect_language(&v))
        .unwrap_or(DEFAULT_LANGUAGE)
}

pub fn is_rtl(tag: &str) -> bool {
    tag == "ar"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_tags_are_kept() {
        for (code, _) in LANGUAGES {
            assert_eq!(detect_language(code), *code);
        }
    }

    #[test]
    fn posix_locales_map_by_prefix() {
        assert_eq!(detect_language("en_US.UTF-8"), "en");
        assert_eq!(detect_language("pt_PT"), "pt-BR");
        assert_eq!(detect_language("zh_CN.UTF-8"), "zh-CN");
        assert_eq!(detect_language("zh_TW"), "zh-HK");
        assert_eq!(detect_language("de_AT@euro"), "de");
    }

    #[test]
    fn unknown_falls_back_to_english() {
        assert_eq!(detect_language("xx"), "en");
        assert_eq!(detect_language(""), "en");
        assert_eq!(normalize("klingon"), "en");
        assert_eq!(normalize("ja"), "ja");
    }

    #[test]
    fn only_arabic_is_rtl() {
        assert!(is_rtl("ar"));
        assert!(!is_rtl("en"));
        assert_eq!(native_name("fr"), Some("Français"));
    }
}
