//! Direction Resolution
//!
//! Order of precedence: static direction, runtime detection, bundle locale,
//! then the resolver's fallback.

use serde::{Deserialize, Serialize};

use crate::options::{BackendOptions, StaticDirection};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Ltr,
    Rtl,
}

impl Direction {
    pub fn as_i32(self) -> i32 {
        match self {
            Self::Ltr => 1,
            Self::Rtl => -1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ltr => "ltr",
            Self::Rtl => "rtl",
        }
    }
}

/// Direction the generated code assumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectiveDirection {
    Fixed(Direction),
    /// Emitted code must evaluate the direction when it runs.
    DeferToRuntime,
}

impl EffectiveDirection {
    /// 1 ltr, -1 rtl, 0 when left to runtime.
    pub fn static_value(self) -> i32 {
        match self {
            Self::Fixed(dir) => dir.as_i32(),
            Self::DeferToRuntime => 0,
        }
    }

    pub fn fixed(self) -> Option<Direction> {
        match self {
            Self::Fixed(dir) => Some(dir),
            Self::DeferToRuntime => None,
        }
    }
}

/// Computes the effective direction for one pipeline run.
///
/// `fallback` applies when neither the options nor a locale say anything.
/// It defaults to LTR; that is a convention, not something derived from input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectionResolver {
    pub fallback: Direction,
}

impl Default for DirectionResolver {
    fn default() -> Self {
        Self { fallback: Direction::Ltr }
    }
}

impl DirectionResolver {
    pub fn with_fallback(fallback: Direction) -> Self {
        Self { fallback }
    }

    pub fn resolve(&self, options: &BackendOptions, locale: Option<&str>) -> EffectiveDirection {
        match options.static_direction() {
            StaticDirection::Ltr => return EffectiveDirection::Fixed(Direction::Ltr),
            StaticDirection::Rtl => return EffectiveDirection::Fixed(Direction::Rtl),
            StaticDirection::Unspecified => {}
        }
        if options.use_runtime_direction_detection() {
            return EffectiveDirection::DeferToRuntime;
        }
        let dir = locale
            .and_then(locale_direction)
            .unwrap_or(self.fallback);
        EffectiveDirection::Fixed(dir)
    }
}

/// Resolve with the default LTR fallback.
pub fn resolve(options: &BackendOptions, locale: Option<&str>) -> EffectiveDirection {
    DirectionResolver::default().resolve(options, locale)
}

const RTL_LANGUAGES: &[&str] = &[
    "ar", "ckb", "dv", "fa", "he", "iw", "ji", "ks", "ku", "ps", "sd", "ug", "ur", "yi",
];

const RTL_SCRIPTS: &[&str] = &["arab", "hebr", "thaa", "nkoo", "syrc", "adlm", "rohg"];

/// Directionality of a locale's script, or `None` for an empty locale.
///
/// An explicit script subtag wins over the language: `ku-Latn` is LTR and
/// `pa-Arab` is RTL. Only the subtag following the language (and any
/// extlangs) can be the script; extension and private-use sections are
/// ignored, so `ar-u-nu-latn` stays RTL.
pub fn locale_direction(locale: &str) -> Option<Direction> {
    let mut subtags = locale
        .split(&['-', '_'][..])
        .filter(|s| !s.is_empty())
        .map(str::to_ascii_lowercase)
        .peekable();

    let language = subtags.next()?;
    // Up to three extlang subtags, e.g. `zh-yue`.
    for _ in 0..3 {
        if subtags.next_if(|s| is_alpha_of_len(s, 3)).is_none() {
            break;
        }
    }
    let script = subtags.next().filter(|s| is_alpha_of_len(s, 4));

    let rtl = match script {
        Some(script) => RTL_SCRIPTS.contains(&script.as_str()),
        None => RTL_LANGUAGES.contains(&language.as_str()),
    };
    Some(if rtl { Direction::Rtl } else { Direction::Ltr })
}

fn is_alpha_of_len(subtag: &str, len: usize) -> bool {
    subtag.len() == len && subtag.chars().all(|c| c.is_ascii_alphabetic())
}
