//! Character sets, collations and identifier folding
//!
//! Only the registry needed to resolve and compare definitions lives here;
//! actual string comparison tables belong to the storage engine. The
//! "new collation framework" flag decides whether collations other than
//! binary affect ordering at all.

/// Server default character set
pub const DEFAULT_CHARSET: &str = "utf8mb4";

/// Server default collation
pub const DEFAULT_COLLATION: &str = "utf8mb4_bin";

struct Charset {
    name: &'static str,
    default_collation: &'static str,
    collations: &'static [&'static str],
    /// Widest encoding of one character, in bytes
    max_bytes: u64,
}

const CHARSETS: &[Charset] = &[
    Charset {
        name: "binary",
        default_collation: "binary",
        collations: &["binary"],
        max_bytes: 1,
    },
    Charset {
        name: "ascii",
        default_collation: "ascii_bin",
        collations: &["ascii_bin", "ascii_general_ci"],
        max_bytes: 1,
    },
    Charset {
        name: "latin1",
        default_collation: "latin1_bin",
        collations: &["latin1_bin", "latin1_swedish_ci"],
        max_bytes: 1,
    },
    Charset {
        name: "utf8",
        default_collation: "utf8_bin",
        collations: &["utf8_bin", "utf8_general_ci", "utf8_unicode_ci"],
        max_bytes: 3,
    },
    Charset {
        name: "utf8mb4",
        default_collation: "utf8mb4_bin",
        collations: &[
            "utf8mb4_bin",
            "utf8mb4_general_ci",
            "utf8mb4_unicode_ci",
            "utf8mb4_0900_ai_ci",
            "utf8mb4_0900_bin",
        ],
        max_bytes: 4,
    },
    Charset {
        name: "gbk",
        default_collation: "gbk_bin",
        collations: &["gbk_bin", "gbk_chinese_ci"],
        max_bytes: 2,
    },
];

/// Errors raised while resolving a charset/collation pair
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CollationError {
    #[error("Unknown character set: '{0}'")]
    UnknownCharset(String),

    #[error("Unknown collation: '{0}'")]
    UnknownCollation(String),

    #[error("COLLATION '{collation}' is not valid for CHARACTER SET '{charset}'")]
    Mismatch { charset: String, collation: String },
}

/// Normalise a charset name (`utf8mb3` is an alias of `utf8`)
fn normalize_charset(name: &str) -> String {
    let lower = name.trim().to_ascii_lowercase();
    match lower.as_str() {
        "utf8mb3" => "utf8".to_string(),
        _ => lower,
    }
}

fn normalize_collation(name: &str) -> String {
    let lower = name.trim().to_ascii_lowercase();
    match lower.strip_prefix("utf8mb3_") {
        Some(rest) => format!("utf8_{}", rest),
        None => lower,
    }
}

fn lookup_charset(name: &str) -> Option<&'static Charset> {
    CHARSETS.iter().find(|c| c.name == name)
}

/// Default collation of a character set
pub fn default_collation(charset: &str) -> Option<&'static str> {
    lookup_charset(&normalize_charset(charset)).map(|c| c.default_collation)
}

/// Widest encoding of one character in a character set, in bytes
pub fn max_bytes_per_char(charset: &str) -> Option<u64> {
    lookup_charset(&normalize_charset(charset)).map(|c| c.max_bytes)
}

/// Character set a collation belongs to
pub fn charset_of_collation(collation: &str) -> Option<&'static str> {
    let collation = normalize_collation(collation);
    CHARSETS
        .iter()
        .find(|c| c.collations.contains(&collation.as_str()))
        .map(|c| c.name)
}

/// Resolve an explicit charset/collation pair against inherited defaults
///
/// Follows the usual precedence: an explicit collation implies its
/// charset, an explicit charset implies its default collation, and with
/// neither the inherited pair is used unchanged.
pub fn resolve(
    charset: Option<&str>,
    collation: Option<&str>,
    inherited: (&str, &str),
) -> Result<(String, String), CollationError> {
    match (charset, collation) {
        (Some(charset), Some(collation)) => {
            let charset = normalize_charset(charset);
            let collation = normalize_collation(collation);
            let info = lookup_charset(&charset)
                .ok_or_else(|| CollationError::UnknownCharset(charset.clone()))?;
            if !info.collations.contains(&collation.as_str()) {
                return match charset_of_collation(&collation) {
                    Some(_) => Err(CollationError::Mismatch { charset, collation }),
                    None => Err(CollationError::UnknownCollation(collation)),
                };
            }
            Ok((charset, collation))
        }
        (Some(charset), None) => {
            let charset = normalize_charset(charset);
            let info = lookup_charset(&charset)
                .ok_or(CollationError::UnknownCharset(charset.clone()))?;
            Ok((charset, info.default_collation.to_string()))
        }
        (None, Some(collation)) => {
            let collation = normalize_collation(collation);
            let charset = charset_of_collation(&collation)
                .ok_or_else(|| CollationError::UnknownCollation(collation.clone()))?;
            Ok((charset.to_string(), collation))
        }
        (None, None) => Ok((inherited.0.to_string(), inherited.1.to_string())),
    }
}

/// Whether converting stored bytes from one charset to another is a no-op
///
/// True for identical charsets and for widening into a superset whose
/// encoding of every existing value is byte-identical.
pub fn is_charset_compatible(from: &str, to: &str) -> bool {
    let from = normalize_charset(from);
    let to = normalize_charset(to);
    if from == to {
        return true;
    }
    matches!(
        (from.as_str(), to.as_str()),
        ("ascii", "latin1") | ("ascii", "utf8") | ("ascii", "utf8mb4") | ("utf8", "utf8mb4")
    )
}

/// Ordering rule of a collation with its charset prefix removed
fn collation_rule(collation: &str) -> String {
    let collation = normalize_collation(collation);
    match charset_of_collation(&collation) {
        Some(charset) if charset != "binary" => collation
            .strip_prefix(charset)
            .and_then(|rest| rest.strip_prefix('_'))
            .unwrap_or(&collation)
            .to_string(),
        _ => collation,
    }
}

/// Whether two collations order and compare every value identically
///
/// With the new collation framework disabled every collation behaves as a
/// binary one, so any pair is compatible.
pub fn is_collation_compatible(from: &str, to: &str, new_collation_enabled: bool) -> bool {
    if !new_collation_enabled {
        return true;
    }
    normalize_collation(from) == normalize_collation(to) || collation_rule(from) == collation_rule(to)
}

/// Fold an identifier for case-insensitive lookups
///
/// The new collation framework compares identifiers with full Unicode case
/// folding; the legacy behaviour folds ASCII letters only.
pub fn fold_identifier(name: &str, new_collation_enabled: bool) -> String {
    if new_collation_enabled {
        name.to_lowercase()
    } else {
        name.to_ascii_lowercase()
    }
}
