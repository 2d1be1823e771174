//! Message catalogs for the error keys a profile view can surface.

use std::{collections::HashMap, fmt, path::Path, str::FromStr};

use anyhow::Context;
use shared::error::keys;

use crate::error::CatalogError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Locale {
    #[default]
    En,
    Fr,
    Ru,
    Es,
}

impl Locale {
    pub const ALL: [Locale; 4] = [Locale::En, Locale::Fr, Locale::Ru, Locale::Es];

    pub fn code(self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Fr => "fr",
            Self::Ru => "ru",
            Self::Es => "es",
        }
    }

    fn column(self) -> usize {
        match self {
            Self::En => 0,
            Self::Fr => 1,
            Self::Ru => 2,
            Self::Es => 3,
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Locale {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim().to_ascii_lowercase();
        Locale::ALL
            .into_iter()
            .find(|locale| locale.code() == code)
            .ok_or_else(|| CatalogError::UnsupportedLocale(s.to_string()))
    }
}

// en, fr, ru, es
const BUILTIN: &[(&str, [&str; 4])] = &[
    (
        keys::ID_NOT_PROVIDED,
        [
            "No profile id was provided.",
            "Aucun identifiant de profil fourni.",
            "Идентификатор профиля не указан.",
            "No se proporcionó ningún identificador de perfil.",
        ],
    ),
    (
        keys::PROFILE_NOT_FOUND,
        [
            "Profile not found.",
            "Profil introuvable.",
            "Профиль не найден.",
            "Perfil no encontrado.",
        ],
    ),
    (
        keys::ERROR_FETCHING_PROFILE,
        [
            "Something went wrong while loading this profile.",
            "Une erreur est survenue lors du chargement du profil.",
            "Не удалось загрузить профиль.",
            "Se produjo un error al cargar el perfil.",
        ],
    ),
    (
        "not-found",
        [
            "This profile does not exist.",
            "Ce profil n'existe pas.",
            "Такого профиля не существует.",
            "Este perfil no existe.",
        ],
    ),
    (
        "blocked",
        [
            "This profile is not available to you.",
            "Ce profil ne vous est pas accessible.",
            "Этот профиль вам недоступен.",
            "Este perfil no está disponible para ti.",
        ],
    ),
    (
        "user-not-found",
        [
            "Your account could not be found.",
            "Votre compte est introuvable.",
            "Ваша учетная запись не найдена.",
            "No se encontró tu cuenta.",
        ],
    ),
];

/// Flat key → text lookup for one locale.
#[derive(Debug, Clone)]
pub struct MessageCatalog {
    locale: Locale,
    messages: HashMap<String, String>,
}

impl Default for MessageCatalog {
    fn default() -> Self {
        Self::builtin(Locale::default())
    }
}

impl MessageCatalog {
    pub fn builtin(locale: Locale) -> Self {
        let messages = BUILTIN
            .iter()
            .map(|(key, texts)| (key.to_string(), texts[locale.column()].to_string()))
            .collect();
        Self { locale, messages }
    }

    /// Built-in messages for `locale`, overlaid with the `key = "text"` pairs
    /// of the TOML file at `path`.
    pub fn load(locale: Locale, path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read message catalog '{}'", path.display()))?;
        let mut catalog = Self::builtin(locale);
        catalog
            .overlay_toml(&raw)
            .with_context(|| format!("failed to load message catalog '{}'", path.display()))?;
        Ok(catalog)
    }

    /// Returns how many keys the overlay defined.
    pub fn overlay_toml(&mut self, raw: &str) -> Result<usize, CatalogError> {
        let entries = toml::from_str::<HashMap<String, String>>(raw)?;
        let count = entries.len();
        self.messages.extend(entries);
        Ok(count)
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    pub fn contains(&self, key: &str) -> bool {
        self.messages.contains_key(key)
    }

    /// Unknown keys come back verbatim so raw server errors still show up.
    pub fn translate(&self, key: &str) -> String {
        let key = if key.is_empty() {
            keys::PROFILE_NOT_FOUND
        } else {
            key
        };
        self.messages
            .get(key)
            .cloned()
            .unwrap_or_else(|| key.to_string())
    }
}
