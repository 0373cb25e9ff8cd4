use crate::clock::Clock;
use serde::Serialize;
use std::fmt;
use std::sync::OnceLock;

/// Sentinel written by build tooling when no version was produced.
pub const PLACEHOLDER: &str = "BUILD_VERSION_PLACEHOLDER";

/// Template variable that survives into output when substitution never ran.
pub const TEMPLATE_MARKER: &str = "VITE_BUILD_TIMESTAMP";

const RUNTIME_SUFFIX: &str = "-runtime";
const SHORT_HASH_LEN: usize = 7;

/// True iff the token is non-empty and not a known placeholder pattern.
pub fn is_valid_version(token: &str) -> bool {
    let token = token.trim();
    !token.is_empty() && token != PLACEHOLDER && !token.contains(TEMPLATE_MARKER)
}

/// Stricter check for meta tag content, which may also carry unexpanded
/// `%VAR%` or `$VAR` syntax from the HTML template.
pub fn is_valid_meta_content(content: &str) -> bool {
    let content = content.trim();
    is_valid_version(content) && !content.contains('%') && !content.starts_with('$')
}

/// Opaque build identifier. Only ever compared for equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct VersionToken(String);

impl VersionToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// `{ts}-{shortCommitHash}`
    pub fn deterministic(timestamp_millis: i64, commit: &str) -> Self {
        let short: String = commit.trim().chars().take(SHORT_HASH_LEN).collect();
        Self(format!("{timestamp_millis}-{short}"))
    }

    /// `{ts}-{random7}`, with a `-runtime` suffix when generated after build.
    pub fn fallback(timestamp_millis: i64, runtime: bool) -> Self {
        let suffix = if runtime { RUNTIME_SUFFIX } else { "" };
        Self(format!("{timestamp_millis}-{}{suffix}", random_alphanumeric()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_valid(&self) -> bool {
        is_valid_version(&self.0)
    }

    pub fn is_runtime_fallback(&self) -> bool {
        self.0.ends_with(RUNTIME_SUFFIX)
    }
}

impl fmt::Display for VersionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<str> for VersionToken {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for VersionToken {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

fn random_alphanumeric() -> String {
    uuid::Uuid::new_v4()
        .simple()
        .to_string()
        .chars()
        .take(SHORT_HASH_LEN)
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StampOrigin {
    /// Supplied by the build environment.
    Injected,
    /// Generated at startup because the build environment had nothing usable.
    RuntimeFallback,
}

/// The version baked into the running binary. Resolved once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildVersionStamp {
    token: VersionToken,
    origin: StampOrigin,
}

impl BuildVersionStamp {
    pub fn resolve(injected: Option<&str>, clock: &dyn Clock) -> Self {
        match injected.map(str::trim) {
            Some(value) if is_valid_version(value) => Self {
                token: VersionToken::new(value),
                origin: StampOrigin::Injected,
            },
            other => {
                if let Some(value) = other {
                    tracing::info!("Ignoring placeholder build version {value:?}");
                }
                let token = VersionToken::fallback(clock.now_millis(), true);
                tracing::info!("Using runtime fallback build version {token}");
                Self {
                    token,
                    origin: StampOrigin::RuntimeFallback,
                }
            }
        }
    }

    /// Process-wide stamp for this binary, from `BUILD_VERSION` at compile time.
    pub fn compiled() -> &'static BuildVersionStamp {
        static COMPILED: OnceLock<BuildVersionStamp> = OnceLock::new();
        COMPILED.get_or_init(|| {
            BuildVersionStamp::resolve(option_env!("BUILD_VERSION"), &crate::clock::SystemClock)
        })
    }

    pub fn token(&self) -> &VersionToken {
        &self.token
    }

    pub fn origin(&self) -> StampOrigin {
        self.origin
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    #[test]
    fn placeholders_are_rejected() {
        for token in [
            "",
            "   ",
            "BUILD_VERSION_PLACEHOLDER",
            "%VITE_BUILD_TIMESTAMP%",
            "$VITE_BUILD_TIMESTAMP",
        ] {
            assert!(!is_valid_version(token), "{token:?} should be invalid");
        }
        assert!(is_valid_version("1718000000000-a1b2c3d"));
    }

    #[test]
    fn meta_content_rejects_template_syntax() {
        assert!(!is_valid_meta_content("%BUILD%"));
        assert!(!is_valid_meta_content("$BUILD"));
        assert!(!is_valid_meta_content("1718000000000-%abc"));
        assert!(is_valid_meta_content("1718000000000-a1b2c3d"));
        // generic check alone does not look at template syntax
        assert!(is_valid_version("$BUILD"));
    }

    #[test]
    fn deterministic_token_uses_short_hash() {
        let token = VersionToken::deterministic(1_700_000_000_000, "abc1234deadbeef");
        assert_eq!(token, "1700000000000-abc1234");
        assert!(!token.is_runtime_fallback());
    }

    #[test]
    fn fallback_token_shape() {
        let build = VersionToken::fallback(1_700_000_000_000, false);
        let parts: Vec<&str> = build.as_str().split('-').collect();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0], "1700000000000");
        assert_eq!(parts[1].len(), 7);
        assert!(parts[1].chars().all(|c| c.is_ascii_alphanumeric()));

        let runtime = VersionToken::fallback(1_700_000_000_000, true);
        assert!(runtime.as_str().ends_with("-runtime"));
        assert!(runtime.is_runtime_fallback());
        assert!(runtime.is_valid());
    }

    #[test]
    fn resolve_prefers_injected_value() {
        let clock = ManualClock::new(5);
        let stamp = BuildVersionStamp::resolve(Some("1718000000000-a1b2c3d"), &clock);
        assert_eq!(stamp.origin(), StampOrigin::Injected);
        assert_eq!(stamp.token(), &"1718000000000-a1b2c3d");
    }

    #[test]
    fn resolve_falls_back_on_placeholder_or_absence() {
        let clock = ManualClock::new(1_700_000_000_000);
        for injected in [None, Some(""), Some("BUILD_VERSION_PLACEHOLDER")] {
            let stamp = BuildVersionStamp::resolve(injected, &clock);
            assert_eq!(stamp.origin(), StampOrigin::RuntimeFallback);
            assert!(stamp.token().as_str().starts_with("1700000000000-"));
            assert!(stamp.token().is_runtime_fallback());
        }
    }

    #[test]
    fn compiled_stamp_is_stable() {
        let first = BuildVersionStamp::compiled();
        let second = BuildVersionStamp::compiled();
        assert!(std::ptr::eq(first, second));
        assert!(first.token().is_valid());
    }
}
