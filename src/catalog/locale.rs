use std::fmt;

use serde::{Deserialize, Serialize};

/// Site language. Unknown codes fall back to English.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    Tr,
    #[default]
    En,
}

impl Locale {
    pub const ALL: [Locale; 2] = [Locale::Tr, Locale::En];

    pub fn as_str(&self) -> &'static str {
        match self {
            Locale::Tr => "tr",
            Locale::En => "en",
        }
    }

    /// Accepts "tr", "TR", "tr-TR" and the like.
    pub fn from_code(code: &str) -> Locale {
        let lang = code.split(['-', '_']).next().unwrap_or("").trim();
        if lang.eq_ignore_ascii_case("tr") {
            Locale::Tr
        } else {
            Locale::En
        }
    }

    pub fn from_param(code: Option<&str>) -> Locale {
        code.map(Locale::from_code).unwrap_or_default()
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
