use std::collections::HashMap;
use std::sync::{Arc, LazyLock, RwLock};

mod generated {
    include!(concat!(env!("OUT_DIR"), "/finform_i18n_generated.rs"));
}

static CATALOG: LazyLock<I18nCatalog> = LazyLock::new(I18nCatalog::load);

#[derive(Clone, Debug, Eq, PartialEq, Default)]
pub enum Locale {
    #[default]
    System,
    Tag(String),
}

impl From<String> for Locale {
    fn from(value: String) -> Self {
        if value.trim().eq_ignore_ascii_case("system") {
            return Self::System;
        }
        Self::Tag(value.trim().to_string())
    }
}

impl From<&str> for Locale {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

/// Resolves message keys against the compiled locale catalogs.
///
/// Clones share the selected locale, so a controller and the page that
/// owns it switch language together.
#[derive(Clone, Debug)]
pub struct I18nManager {
    locale: Arc<RwLock<Locale>>,
}

impl Default for I18nManager {
    fn default() -> Self {
        Self::new()
    }
}

impl I18nManager {
    pub fn new() -> Self {
        Self::with_locale(Locale::System)
    }

    /// Pinned to the catalog's default locale, ignoring the system setting.
    pub fn fallback() -> Self {
        Self::with_locale(CATALOG.default_locale)
    }

    pub fn with_locale(locale: impl Into<Locale>) -> Self {
        Self {
            locale: Arc::new(RwLock::new(locale.into())),
        }
    }

    pub fn locale(&self) -> Locale {
        match self.locale.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn set_locale(&self, locale: impl Into<Locale>) {
        let mut guard = match self.locale.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = locale.into();
    }

    pub fn default_locale(&self) -> &'static str {
        CATALOG.default_locale
    }

    pub fn resolved_locale(&self) -> &'static str {
        CATALOG.resolve_locale(self.requested_locale().as_deref())
    }

    pub fn has_key(&self, key: &str) -> bool {
        self.lookup(key).is_some()
    }

    pub fn t(&self, key: &str) -> String {
        self.lookup(key).unwrap_or(key).to_string()
    }

    pub fn t_with(&self, key: &str, params: &[(&str, &str)]) -> String {
        let raw = self.lookup(key).unwrap_or(key);
        if params.is_empty() {
            return raw.to_string();
        }
        format_template(raw, params)
    }

    fn requested_locale(&self) -> Option<String> {
        match self.locale() {
            Locale::System => system_locale(),
            Locale::Tag(tag) => Some(tag),
        }
    }

    fn lookup(&self, key: &str) -> Option<&'static str> {
        let resolved = self.resolved_locale();
        CATALOG
            .lookup(resolved, key)
            .or_else(|| CATALOG.lookup(CATALOG.default_locale, key))
    }
}

#[cfg(feature = "i18n")]
fn system_locale() -> Option<String> {
    sys_locale::get_locale()
}

#[cfg(not(feature = "i18n"))]
fn system_locale() -> Option<String> {
    None
}

struct I18nCatalog {
    default_locale: &'static str,
    locales: HashMap<&'static str, HashMap<&'static str, &'static str>>,
}

impl I18nCatalog {
    fn load() -> Self {
        let locales = generated::LOCALES
            .iter()
            .map(|(locale, entries)| (*locale, entries.iter().copied().collect()))
            .collect();
        Self {
            default_locale: generated::DEFAULT_LOCALE,
            locales,
        }
    }

    /// Exact tag first (`es-MX`), then its language (`es`), then the default.
    fn resolve_locale(&self, requested: Option<&str>) -> &'static str {
        let Some(requested) = requested else {
            return self.default_locale;
        };
        let tag = normalize_locale_tag(requested);
        let language = tag.split('-').next().unwrap_or_default();
        self.find_locale(&tag)
            .or_else(|| self.find_locale(language))
            .unwrap_or(self.default_locale)
    }

    fn find_locale(&self, tag: &str) -> Option<&'static str> {
        self.locales
            .keys()
            .copied()
            .find(|locale| normalize_locale_tag(locale) == tag)
    }

    fn lookup(&self, locale: &'static str, key: &str) -> Option<&'static str> {
        self.locales
            .get(locale)
            .and_then(|entries| entries.get(key).copied())
    }
}

/// `es_MX.UTF-8@euro` -> `es-mx`.
fn normalize_locale_tag(tag: &str) -> String {
    let base = tag.trim().split(['.', '@']).next().unwrap_or_default();
    base.split(['-', '_'])
        .filter(|segment| !segment.is_empty())
        .map(str::to_ascii_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}

/// Replaces `{name}` with its parameter. Unknown names and an unclosed
/// brace are copied through.
fn format_template(template: &str, params: &[(&str, &str)]) -> String {
    let mut output = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        output.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let Some(close) = after.find('}') else {
            output.push_str(&rest[open..]);
            return output;
        };
        let name = &after[..close];
        match params.iter().find(|(key, _)| *key == name) {
            Some((_, value)) => output.push_str(value),
            None => output.push_str(&rest[open..open + close + 2]),
        }
        rest = &after[close + 1..];
    }
    output.push_str(rest);
    output
}
