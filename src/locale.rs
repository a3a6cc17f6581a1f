//! Mobipocket locale numbers.
//!
//! The MOBI header stores the document language as a packed number: the
//! low byte is the language code, the next byte is four times the region
//! code. The registry below maps those to IANA-style subtags, with the
//! historical Mobipocket quirks kept as-is.

/// Language rows indexed by Mobipocket language code; each row holds the
/// region variants, index 0 being the bare language tag.
static LOCALES: [&[&str]; 99] = [
    &["neutral"],
    &[
        "ar",    // Arabic
        "ar-sa", // Saudi Arabia
        "ar",
        "ar-eg", // Egypt
        "ar",
        "ar-dz", // Algeria
        "ar-ma", // Morocco
        "ar-tn", // Tunisia
        "ar-om", // Oman
        "ar-ye", // Yemen
        "ar-sy", // Syria
        "ar-jo", // Jordan
        "ar-lb", // Lebanon
        "ar-kw", // Kuwait
        "ar-ae", // UAE
        "ar-bh", // Bahrain
        "ar-qa", // Qatar
    ],
    &["bg"], // Bulgarian
    &["ca"], // Catalan
    &["zh", "zh-tw", "zh-cn", "zh-hk", "zh-sg"], // Chinese
    &["cs"], // Czech
    &["da"], // Danish
    &["de", "de-de", "de-ch", "de-at", "de-lu", "de-li"], // German
    &["el"], // Greek
    &[
        "en",    // English
        "en-us", // United States
        "en-gb", // United Kingdom
        "en-au", // Australia
        "en-ca", // Canada
        "en-nz", // New Zealand
        "en-ie", // Ireland
        "en-za", // South Africa
        "en-jm", // Jamaica
        "en",
        "en-bz", // Belize
        "en-tt", // Trinidad
        "en-zw", // Zimbabwe
        "en-ph", // Philippines
    ],
    &[
        "es",    // Spanish
        "es-es", // Spain
        "es-mx", // Mexico
        "es",
        "es-gt", // Guatemala
        "es-cr", // Costa Rica
        "es-pa", // Panama
        "es-do", // Dominican Republic
        "es-ve", // Venezuela
        "es-co", // Colombia
        "es-pe", // Peru
        "es-ar", // Argentina
        "es-ec", // Ecuador
        "es-cl", // Chile
        "es-uy", // Uruguay
        "es-py", // Paraguay
        "es-bo", // Bolivia
        "es-sv", // El Salvador
        "es-hn", // Honduras
        "es-ni", // Nicaragua
        "es-pr", // Puerto Rico
    ],
    &["fi"], // Finnish
    &["fr", "fr-fr", "fr-be", "fr-ca", "fr-ch", "fr-lu", "fr-mc"], // French
    &["he"], // Hebrew
    &["hu"], // Hungarian
    &["is"], // Icelandic
    &["it", "it-it", "it-ch"], // Italian
    &["ja"], // Japanese
    &["ko"], // Korean
    &["nl", "nl-nl", "nl-be"], // Dutch
    &["no"], // Norwegian
    &["pl"], // Polish
    &["pt", "pt-br", "pt-pt"], // Portuguese
    &["rm"], // Romansh
    &["ro"], // Romanian
    &["ru"], // Russian
    &["hr"], // Croatian
    &["sr", "sr", "sr", "sr"], // Serbian
    &["sk"], // Slovak
    &["sq"], // Albanian
    &["sv", "sv-se", "sv-fi"], // Swedish
    &["th"], // Thai
    &["tr"], // Turkish
    &["ur"], // Urdu
    &["id"], // Indonesian
    &["uk"], // Ukrainian
    &["be"], // Belarusian
    &["sl"], // Slovenian
    &["et"], // Estonian
    &["lv"], // Latvian
    &["lt"], // Lithuanian
    &["fa"], // Farsi
    &["vi"], // Vietnamese
    &["hy"], // Armenian
    &["az"], // Azerbaijani
    &["eu"], // Basque
    &["sb"], // "Sorbian"
    &["mk"], // Macedonian
    &["sx"], // "Sutu"
    &["ts"], // Tsonga
    &["tn"], // Tswana
    &[],
    &["xh"], // Xhosa
    &["zu"], // Zulu
    &["af"], // Afrikaans
    &["ka"], // Georgian
    &["fo"], // Faroese
    &["hi"], // Hindi
    &["mt"], // Maltese
    &["sz"], // "Sami (Lappish)"
    &["ga"], // Irish
    &[],
    &["ms"], // Malay
    &["kk"], // Kazakh
    &[],
    &["sw"], // Swahili
    &[],
    &["uz", "uz", "uz-uz"], // Uzbek
    &["tt"], // Tatar
    &["bn"], // Bengali
    &["pa"], // Punjabi
    &["gu"], // Gujarati
    &["or"], // Oriya
    &["ta"], // Tamil
    &["te"], // Telugu
    &["kn"], // Kannada
    &["ml"], // Malayalam
    &["as"], // Assamese
    &["mr"], // Marathi
    &["sa"], // Sanskrit
    &[],
    &[],
    &["cy", "cy-gb"], // Welsh
    &["gl", "gl-es"], // Galician
    &[],
    &[],
    &[],
    &["x-kok"], // Konkani
    &[],
    &[],
    &[],
    &[],
    &[],
    &[],
    &[],
    &[],
    &[],
    &["ne"], // Nepali
    &["fy"], // Northern Frysian
];

/// Locale subtag for a packed Mobipocket locale number, if known.
pub fn locale_string(locale_number: u32) -> Option<&'static str> {
    let lang = (locale_number & 0xff) as usize;
    let region = ((locale_number >> 8) / 4) as usize;
    let tag = *LOCALES.get(lang)?.get(region)?;
    if tag.is_empty() { None } else { Some(tag) }
}

/// Packed Mobipocket locale number for a subtag. Matches the bare
/// language when the region is unknown; returns 0 when nothing matches.
pub fn locale_number(locale_string: &str) -> u32 {
    if locale_string.len() < 2 {
        return 0;
    }
    let lower = locale_string.to_ascii_lowercase();
    for (lang, regions) in LOCALES.iter().enumerate() {
        let Some(first) = regions.first() else {
            continue;
        };
        if first.get(..2) != lower.get(..2) {
            continue;
        }
        for (region, tag) in regions.iter().enumerate() {
            if *tag == lower {
                return ((region as u32) * 4) << 8 | lang as u32;
            }
        }
        return lang as u32;
    }
    0
}
