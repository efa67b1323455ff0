//! Locale-aware string resolution.

use std::sync::Arc;

use cis_core::ClientStorage;

use crate::error::I18nError;
use crate::locale::Locale;
use crate::table::{interpolate, LocaleTable, Params};

/// Storage key holding the active locale code
pub const LOCALE_KEY: &str = "locale";

const BUNDLED_EN: &str = include_str!("../locales/en.json");
const BUNDLED_RW: &str = include_str!("../locales/rw.json");

/// The string tables for every supported locale. Built once, never mutated.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    en: LocaleTable,
    rw: LocaleTable,
}

impl Catalog {
    /// Tables shipped with the binary.
    pub fn bundled() -> Self {
        Self {
            en: bundled_table(Locale::En, BUNDLED_EN),
            rw: bundled_table(Locale::Rw, BUNDLED_RW),
        }
    }

    pub fn from_json(en: &str, rw: &str) -> Result<Self, I18nError> {
        Ok(Self {
            en: LocaleTable::from_json(en)?,
            rw: LocaleTable::from_json(rw)?,
        })
    }

    pub fn table(&self, locale: Locale) -> &LocaleTable {
        match locale {
            Locale::En => &self.en,
            Locale::Rw => &self.rw,
        }
    }

    /// Keys present in `reference` that `target` doesn't translate.
    pub fn missing_keys(&self, reference: Locale, target: Locale) -> Vec<String> {
        let target = self.table(target);
        self.table(reference)
            .keys()
            .into_iter()
            .filter(|key| target.lookup(key).is_none())
            .collect()
    }
}

// A broken bundled table degrades to raw keys instead of taking the UI down.
fn bundled_table(locale: Locale, json: &str) -> LocaleTable {
    LocaleTable::from_json(json).unwrap_or_else(|e| {
        tracing::error!("Bundled {} translations failed to load: {}", locale, e);
        LocaleTable::default()
    })
}

/// Resolves keys against one locale's table.
///
/// The active locale is fixed for the lifetime of a `Translator`. Changing
/// language produces a new one, and everything holding the old one is
/// expected to be rebuilt with it.
#[derive(Debug, Clone)]
pub struct Translator {
    catalog: Arc<Catalog>,
    locale: Locale,
}

impl Translator {
    pub fn new(catalog: Arc<Catalog>, locale: Locale) -> Self {
        Self { catalog, locale }
    }

    /// Bundled catalog with the persisted locale, or Kinyarwanda when none is stored.
    pub fn load(storage: &ClientStorage) -> Self {
        Self::load_with(Arc::new(Catalog::bundled()), storage, Locale::default())
    }

    /// Like [`Translator::load`] with a custom catalog and first-run locale.
    /// An unrecognized stored code is ignored.
    pub fn load_with(catalog: Arc<Catalog>, storage: &ClientStorage, fallback: Locale) -> Self {
        let locale = match storage.get(LOCALE_KEY) {
            Some(code) => code.parse().unwrap_or_else(|_| {
                tracing::warn!("Ignoring unsupported stored locale {:?}", code);
                fallback
            }),
            None => fallback,
        };

        tracing::debug!("Active locale: {}", locale);
        Self::new(catalog, locale)
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    /// Resolve `key` in the active locale, filling `{{name}}` placeholders from `params`.
    ///
    /// Never fails: a key that doesn't lead to a string comes back unchanged.
    pub fn resolve(&self, key: &str, params: &Params<'_>) -> String {
        match self.catalog.table(self.locale).lookup(key) {
            Some(template) => interpolate(template, params),
            None => {
                tracing::debug!("Missing translation key {:?} for locale {}", key, self.locale);
                key.to_string()
            }
        }
    }

    pub fn t(&self, key: &str) -> String {
        self.resolve(key, &[])
    }

    /// Switch language. Only `en` and `rw` are accepted; anything else gives back
    /// this translator unchanged.
    ///
    /// A valid code is persisted under [`LOCALE_KEY`]. If the write fails the
    /// switch still applies for this session.
    pub fn change_locale(self, code: &str, storage: &ClientStorage) -> Self {
        let locale: Locale = match code.parse() {
            Ok(locale) => locale,
            Err(e) => {
                tracing::debug!("Locale change ignored: {}", e);
                return self;
            }
        };

        if let Err(e) = storage.set(LOCALE_KEY, locale.code()) {
            tracing::warn!("Failed to persist locale {}: {}", locale, e);
        }

        tracing::info!("Locale changed from {} to {}", self.locale, locale);
        Self::new(self.catalog, locale)
    }
}
