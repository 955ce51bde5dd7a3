//! Name resolution for provisioned repositories.
//!
//! A directive either carries an explicit base name or asks for generated
//! placeholder names. Explicit names get an index suffix when more than one
//! copy is requested; generated names are drawn independently per copy, so
//! two unnamed copies of the same directive share no common stem.

/// Source of placeholder names for directives with no configured name.
pub trait NameGenerator: Send + Sync {
    fn generate(&self) -> String;
}

/// Default generator: three random words joined with hyphens, in the shape
/// `adjective-adjective-surname`.
pub struct RandomNameGenerator;

const WORDS: &[&str] = &[
    "amber", "brisk", "cedar", "delta", "ember", "frost", "gleam", "harbor",
    "indigo", "juniper", "keystone", "lunar", "meadow", "nimble", "onyx",
    "prairie", "quartz", "raven", "summit", "thistle", "umber", "vivid",
    "willow", "zenith", "anchor", "beacon", "canyon", "drift", "echo",
    "fable", "grove", "hollow",
];

const SURNAMES: &[&str] = &[
    "archer", "baxter", "carver", "dalton", "ellis", "fletcher", "granger",
    "hayes", "irwin", "jensen", "keller", "lawson", "mercer", "nolan",
    "osborne", "porter", "quinn", "ramsey", "sawyer", "thatcher", "underwood",
    "vance", "walker", "york",
];

impl NameGenerator for RandomNameGenerator {
    fn generate(&self) -> String {
        use rand::seq::SliceRandom;
        let mut rng = rand::thread_rng();
        // SliceRandom::choose only returns None for an empty slice
        let a = WORDS.choose(&mut rng).copied().unwrap_or("repo");
        let b = WORDS.choose(&mut rng).copied().unwrap_or("copy");
        let c = SURNAMES.choose(&mut rng).copied().unwrap_or("smith");
        format!("{}-{}-{}", a, b, c)
    }
}

/// Replace any character not allowed in a repository name with `-`.
/// GitHub accepts ASCII alphanumerics, `-`, `_`, and `.`.
fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '-'
            }
        })
        .collect()
}

/// Resolve the final name for the `index`-th copy of a directive.
///
/// - no base name → a freshly generated placeholder, sanitized
/// - base name, `count > 1` → `{base}-{index}` for batch uniqueness
/// - base name, `count == 1` → the base verbatim
pub fn resolve_name(
    base: Option<&str>,
    index: u32,
    count: u32,
    generator: &dyn NameGenerator,
) -> String {
    match base {
        Some(name) if !name.is_empty() => {
            if count > 1 {
                format!("{}-{}", name, index)
            } else {
                name.to_string()
            }
        }
        _ => sanitize(&generator.generate()),
    }
}
