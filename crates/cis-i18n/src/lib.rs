//! Translation resolver for the CIS user interface.
//!
//! Strings live in nested per-locale JSON tables and are looked up by dotted
//! key (`farmers.title`). Lookups never fail; an unknown key resolves to itself.

pub mod error;
pub mod locale;
pub mod table;
pub mod translator;

pub use error::I18nError;
pub use locale::Locale;
pub use table::{interpolate, LocaleTable, Params};
pub use translator::{Catalog, Translator, LOCALE_KEY};
