//! String utility functions.
//!
//! The case converter maps identifiers between the model convention
//! (usually camelCase) and the database convention (usually `snake_case`).
//! Table names are derived from model names with [`table_name_for`].

use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

/// A naming convention applied by [`convert_case`].
#[derive(Clone, Default)]
pub enum CaseConvention {
    /// `snake_case`.
    #[default]
    Snake,
    /// `camelCase`.
    Camel,
    /// Leave identifiers untouched.
    None,
    /// Replace every match of the pattern with its upper-cased first
    /// capture group, or the whole match upper-cased when it has none.
    Pattern(Regex),
    /// A function-valued convention. Identifiers pass through verbatim and
    /// the function is never called.
    Custom(fn(&str) -> String),
}

impl fmt::Debug for CaseConvention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Snake => f.write_str("Snake"),
            Self::Camel => f.write_str("Camel"),
            Self::None => f.write_str("None"),
            Self::Pattern(re) => f.debug_tuple("Pattern").field(&re.as_str()).finish(),
            Self::Custom(_) => f.write_str("Custom"),
        }
    }
}

/// Converts `value` to the given naming convention.
///
/// # Examples
///
/// ```
/// use hysteria_core::utils::text::{convert_case, CaseConvention};
///
/// assert_eq!(convert_case("userName", &CaseConvention::Snake), "user_name");
/// assert_eq!(convert_case("user_name", &CaseConvention::Camel), "userName");
/// assert_eq!(convert_case("ID", &CaseConvention::Camel), "ID");
/// ```
pub fn convert_case(value: &str, convention: &CaseConvention) -> String {
    match convention {
        CaseConvention::Snake => to_snake_case(value),
        CaseConvention::Camel => to_camel_case(value),
        CaseConvention::Pattern(re) => re
            .replace_all(value, |caps: &regex::Captures<'_>| {
                caps.get(1)
                    .or_else(|| caps.get(0))
                    .map_or_else(String::new, |m| m.as_str().to_uppercase())
            })
            .into_owned(),
        CaseConvention::None | CaseConvention::Custom(_) => value.to_string(),
    }
}

/// Converts `value` to `snake_case`.
///
/// An underscore is inserted before every uppercase letter that follows a
/// lowercase letter or a digit, then everything is lowercased.
pub fn to_snake_case(value: &str) -> String {
    static BOUNDARY: OnceLock<Regex> = OnceLock::new();

    if value.chars().all(|c| !c.is_uppercase()) {
        return value.to_string();
    }
    let boundary = BOUNDARY.get_or_init(|| Regex::new(r"([a-z0-9])([A-Z])").unwrap());
    boundary.replace_all(value, "${1}_${2}").to_lowercase()
}

/// Converts `value` to `camelCase` by upper-casing the character after each
/// underscore. A value with no lowercase letters is returned unchanged.
pub fn to_camel_case(value: &str) -> String {
    static UNDERSCORE: OnceLock<Regex> = OnceLock::new();

    if value.chars().all(|c| !c.is_lowercase()) {
        return value.to_string();
    }
    let underscore = UNDERSCORE.get_or_init(|| Regex::new(r"_([A-Za-z0-9])").unwrap());
    underscore
        .replace_all(value, |caps: &regex::Captures<'_>| caps[1].to_uppercase())
        .into_owned()
}

/// Pluralizes an English noun with the usual suffix rules.
///
/// ```
/// use hysteria_core::utils::text::pluralize;
///
/// assert_eq!(pluralize("user"), "users");
/// assert_eq!(pluralize("category"), "categories");
/// assert_eq!(pluralize("address"), "addresses");
/// ```
pub fn pluralize(word: &str) -> String {
    if word.is_empty() {
        return String::new();
    }
    let lower = word.to_lowercase();
    if let Some(stem) = word.strip_suffix('y') {
        let before = stem.chars().last().map(|c| c.to_ascii_lowercase());
        if !matches!(before, Some('a' | 'e' | 'i' | 'o' | 'u') | None) {
            return format!("{stem}ies");
        }
    }
    if ["s", "x", "z", "ch", "sh"].iter().any(|s| lower.ends_with(s)) {
        return format!("{word}es");
    }
    format!("{word}s")
}

/// Derives the default table name for a model: the pluralized `snake_case`
/// form of its name.
///
/// ```
/// use hysteria_core::utils::text::table_name_for;
///
/// assert_eq!(table_name_for("UserProfile"), "user_profiles");
/// ```
pub fn table_name_for(model_name: &str) -> String {
    pluralize(&to_snake_case(model_name))
}
