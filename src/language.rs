use serde::{Deserialize, Serialize};
use strum::{EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

/// Response languages the backend understands
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    EnumString,
    EnumIter,
    IntoStaticStr,
)]
#[strum(ascii_case_insensitive)]
pub enum Language {
    #[default]
    #[strum(serialize = "en-US")]
    #[serde(rename = "en-US")]
    EnUs,
    #[strum(serialize = "en-UK")]
    #[serde(rename = "en-UK")]
    EnUk,
    #[strum(serialize = "en-IN")]
    #[serde(rename = "en-IN")]
    EnIn,
    #[strum(serialize = "de")]
    #[serde(rename = "de")]
    De,
}

impl Language {
    /// Wire code sent as the `language` field
    pub fn code(self) -> &'static str {
        self.into()
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Language::EnUs => "English (US)",
            Language::EnUk => "English (UK)",
            Language::EnIn => "English (India)",
            Language::De => "German",
        }
    }

    /// Next language in selector order, wrapping around
    pub fn next(self) -> Language {
        let all: Vec<Language> = Language::iter().collect();
        let index = all.iter().position(|l| *l == self).unwrap_or(0);
        all[(index + 1) % all.len()]
    }

    pub fn codes() -> Vec<&'static str> {
        Language::iter().map(Language::code).collect()
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}
