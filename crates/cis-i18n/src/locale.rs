use std::fmt;
use std::str::FromStr;

use crate::error::I18nError;

/// UI language. Only English and Kinyarwanda are supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Locale {
    En,
    #[default]
    Rw,
}

impl Locale {
    pub const ALL: [Locale; 2] = [Locale::En, Locale::Rw];

    pub fn code(&self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Rw => "rw",
        }
    }

    /// Translation key for the language's display name
    pub fn name_key(&self) -> &'static str {
        match self {
            Self::En => "settings.languages.en",
            Self::Rw => "settings.languages.rw",
        }
    }
}

impl FromStr for Locale {
    type Err = I18nError;

    /// Codes are matched exactly; `EN` or `en-US` are rejected.
    fn from_str(code: &str) -> Result<Self, Self::Err> {
        match code {
            "en" => Ok(Self::En),
            "rw" => Ok(Self::Rw),
            other => Err(I18nError::UnsupportedLocale(other.to_string())),
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}
