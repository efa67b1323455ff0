use thiserror::Error;

#[derive(Error, Debug)]
pub enum I18nError {
    #[error("Unsupported locale: {0:?}")]
    UnsupportedLocale(String),

    #[error("Invalid translation table: {0}")]
    InvalidTable(String),
}
