use crate::error::{ResourceError, Result};
use std::fmt;

/// The subset of a BCP-47 tag that matching looks at.
///
/// Parsing is lenient about case and accepts `_` as a separator. Extended
/// language subtags and everything from the first singleton on (extensions,
/// private use) are dropped.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LanguageTag {
    pub language: String,
    pub script: Option<String>,
    pub region: Option<String>,
    pub variants: Vec<String>,
}

impl LanguageTag {
    pub fn parse(input: &str) -> Result<Self> {
        let invalid = || ResourceError::Format(format!("invalid language tag: {input:?}"));

        let mut subtags = input.trim().split(['-', '_']);
        let language = subtags.next().filter(|s| !s.is_empty()).ok_or_else(invalid)?;
        if !(2..=8).contains(&language.len()) || !language.bytes().all(|b| b.is_ascii_alphabetic()) {
            return Err(invalid());
        }

        let mut tag = LanguageTag {
            language: language.to_ascii_lowercase(),
            script: None,
            region: None,
            variants: Vec::new(),
        };

        let mut extlangs = 0;
        for subtag in subtags {
            if subtag.is_empty() || !subtag.bytes().all(|b| b.is_ascii_alphanumeric()) {
                return Err(invalid());
            }
            let alpha = subtag.bytes().all(|b| b.is_ascii_alphabetic());
            let digit = subtag.bytes().all(|b| b.is_ascii_digit());
            match subtag.len() {
                1 => break,
                3 if alpha
                    && extlangs < 3
                    && tag.script.is_none()
                    && tag.region.is_none()
                    && tag.variants.is_empty() =>
                {
                    extlangs += 1;
                }
                4 if alpha && tag.script.is_none() && tag.region.is_none() && tag.variants.is_empty() => {
                    tag.script = Some(titlecase(subtag));
                }
                2 if alpha && tag.region.is_none() && tag.variants.is_empty() => {
                    tag.region = Some(subtag.to_ascii_uppercase());
                }
                3 if digit && tag.region.is_none() && tag.variants.is_empty() => {
                    tag.region = Some(subtag.to_string());
                }
                5..=8 => tag.variants.push(subtag.to_ascii_lowercase()),
                4 if subtag.as_bytes()[0].is_ascii_digit() => {
                    tag.variants.push(subtag.to_ascii_lowercase())
                }
                _ => return Err(invalid()),
            }
        }
        Ok(tag)
    }

    /// Fill in the likely script and region for the language.
    pub fn maximize(&self) -> LanguageTag {
        let mut tag = self.clone();
        if tag.script.is_none() {
            tag.script = likely_script(&tag.language, tag.region.as_deref()).map(str::to_string);
        }
        if tag.region.is_none() {
            tag.region = likely_region(&tag.language, tag.script.as_deref()).map(str::to_string);
        }
        tag
    }
}

impl fmt::Display for LanguageTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.language)?;
        if let Some(script) = &self.script {
            write!(f, "-{script}")?;
        }
        if let Some(region) = &self.region {
            write!(f, "-{region}")?;
        }
        for variant in &self.variants {
            write!(f, "-{variant}")?;
        }
        Ok(())
    }
}

impl std::str::FromStr for LanguageTag {
    type Err = ResourceError;

    fn from_str(s: &str) -> Result<Self> {
        LanguageTag::parse(s)
    }
}

fn titlecase(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for (i, c) in s.chars().enumerate() {
        if i == 0 {
            out.push(c.to_ascii_uppercase());
        } else {
            out.push(c.to_ascii_lowercase());
        }
    }
    out
}

// language, default script, default region
const LIKELY: &[(&str, &str, &str)] = &[
    ("ar", "Arab", "EG"),
    ("de", "Latn", "DE"),
    ("en", "Latn", "US"),
    ("es", "Latn", "ES"),
    ("fa", "Arab", "IR"),
    ("fr", "Latn", "FR"),
    ("he", "Hebr", "IL"),
    ("hi", "Deva", "IN"),
    ("id", "Latn", "ID"),
    ("it", "Latn", "IT"),
    ("ja", "Jpan", "JP"),
    ("ko", "Kore", "KR"),
    ("ms", "Latn", "MY"),
    ("nl", "Latn", "NL"),
    ("pl", "Latn", "PL"),
    ("pt", "Latn", "BR"),
    ("ru", "Cyrl", "RU"),
    ("sr", "Cyrl", "RS"),
    ("th", "Thai", "TH"),
    ("tr", "Latn", "TR"),
    ("uk", "Cyrl", "UA"),
    ("vi", "Latn", "VN"),
    ("yue", "Hant", "HK"),
    ("zh", "Hans", "CN"),
];

fn likely_script(language: &str, region: Option<&str>) -> Option<&'static str> {
    match (language, region) {
        ("zh", Some("TW" | "HK" | "MO")) => Some("Hant"),
        _ => LIKELY
            .iter()
            .find(|(l, _, _)| *l == language)
            .map(|(_, s, _)| *s),
    }
}

fn likely_region(language: &str, script: Option<&str>) -> Option<&'static str> {
    match (language, script) {
        ("zh", Some("Hant")) => Some("TW"),
        (_, Some(script)) => LIKELY
            .iter()
            .find(|(l, s, _)| *l == language && *s == script)
            .map(|(_, _, r)| *r),
        _ => LIKELY
            .iter()
            .find(|(l, _, _)| *l == language)
            .map(|(_, _, r)| *r),
    }
}
