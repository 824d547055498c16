//! Language normalization.
//!
//! Catalog rows carry free-text languages ("English", "eng", "en-US", ...).
//! They are mapped to a lowercase ISO-639-1 code and a display name.

struct Language {
    code: &'static str,
    display: &'static str,
    aliases: &'static [&'static str],
}

const LANGUAGES: &[Language] = &[
    Language { code: "en", display: "English", aliases: &["eng", "english"] },
    Language { code: "es", display: "Spanish", aliases: &["spa", "spanish", "español", "espanol", "castellano"] },
    Language { code: "fr", display: "French", aliases: &["fre", "fra", "french", "français", "francais"] },
    Language { code: "de", display: "German", aliases: &["ger", "deu", "german", "deutsch"] },
    Language { code: "it", display: "Italian", aliases: &["ita", "italian", "italiano"] },
    Language { code: "pt", display: "Portuguese", aliases: &["por", "portuguese", "português", "portugues"] },
    Language { code: "nl", display: "Dutch", aliases: &["dut", "nld", "dutch", "nederlands"] },
    Language { code: "ru", display: "Russian", aliases: &["rus", "russian", "русский"] },
    Language { code: "pl", display: "Polish", aliases: &["pol", "polish", "polski"] },
    Language { code: "sv", display: "Swedish", aliases: &["swe", "swedish", "svenska"] },
    Language { code: "no", display: "Norwegian", aliases: &["nor", "nob", "nb", "norwegian", "norsk"] },
    Language { code: "da", display: "Danish", aliases: &["dan", "danish", "dansk"] },
    Language { code: "fi", display: "Finnish", aliases: &["fin", "finnish", "suomi"] },
    Language { code: "tr", display: "Turkish", aliases: &["tur", "turkish", "türkçe"] },
    Language { code: "el", display: "Greek", aliases: &["gre", "ell", "greek"] },
    Language { code: "ar", display: "Arabic", aliases: &["ara", "arabic"] },
    Language { code: "he", display: "Hebrew", aliases: &["heb", "hebrew"] },
    Language { code: "hi", display: "Hindi", aliases: &["hin", "hindi"] },
    Language { code: "ja", display: "Japanese", aliases: &["jpn", "japanese", "日本語"] },
    Language { code: "zh", display: "Chinese", aliases: &["chi", "zho", "chinese", "中文"] },
    Language { code: "ko", display: "Korean", aliases: &["kor", "korean"] },
    Language { code: "id", display: "Indonesian", aliases: &["ind", "indonesian", "bahasa indonesia"] },
    Language { code: "vi", display: "Vietnamese", aliases: &["vie", "vietnamese"] },
    Language { code: "cs", display: "Czech", aliases: &["cze", "ces", "czech"] },
    Language { code: "hu", display: "Hungarian", aliases: &["hun", "hungarian", "magyar"] },
    Language { code: "ro", display: "Romanian", aliases: &["rum", "ron", "romanian"] },
    Language { code: "uk", display: "Ukrainian", aliases: &["ukr", "ukrainian"] },
    Language { code: "fa", display: "Persian", aliases: &["per", "fas", "persian", "farsi"] },
    Language { code: "ca", display: "Catalan", aliases: &["cat", "catalan", "català"] },
    Language { code: "bg", display: "Bulgarian", aliases: &["bul", "bulgarian"] },
];

fn lookup(key: &str) -> Option<&'static Language> {
    LANGUAGES.iter().find(|lang| {
        lang.code == key || lang.aliases.contains(&key) || lang.display.eq_ignore_ascii_case(key)
    })
}

/// Find a known language by name or code, also accepting region-tagged
/// codes such as `en-US` or `pt_BR`.
fn resolve(raw: &str) -> Option<&'static Language> {
    let key = raw.trim().to_lowercase();
    if key.is_empty() {
        return None;
    }

    lookup(&key).or_else(|| {
        key.split(['-', '_'])
            .next()
            .filter(|prefix| prefix.len() < key.len())
            .and_then(lookup)
    })
}

/// Normalize free-text language into `(code, display name)`.
pub fn normalize(raw: &str) -> (String, String) {
    match resolve(raw) {
        Some(lang) => (lang.code.to_string(), lang.display.to_string()),
        None => (raw.trim().to_lowercase(), raw.trim().to_string()),
    }
}
