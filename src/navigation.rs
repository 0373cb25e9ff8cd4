use crate::clock::Clock;
use crate::error::AppError;
use std::io::Write;
use std::sync::Mutex;
use url::Url;

/// Query parameter carrying the cache-busting value.
pub const CACHE_BUST_PARAM: &str = "_cb";

/// Moves the client to a new location, replacing the current history entry.
pub trait Navigator: Send + Sync {
    fn current_url(&self) -> String;
    fn replace(&self, url: &str) -> Result<(), AppError>;
}

/// Unique `{ts}-{random}` value for defeating HTTP caches.
pub fn cache_bust_value(clock: &dyn Clock) -> String {
    let random = uuid::Uuid::new_v4().simple().to_string();
    format!("{}-{}", clock.now_millis(), &random[..8])
}

/// `url` with any previous cache-bust parameter replaced by `value`.
pub fn cache_busted_url(url: &str, value: &str) -> String {
    match Url::parse(url) {
        Ok(mut parsed) => {
            let kept: Vec<(String, String)> = parsed
                .query_pairs()
                .filter(|(k, _)| k != CACHE_BUST_PARAM)
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect();
            parsed
                .query_pairs_mut()
                .clear()
                .extend_pairs(kept)
                .append_pair(CACHE_BUST_PARAM, value);
            parsed.to_string()
        }
        // Relative locations: append without touching what is already there
        Err(_) => {
            let (base, fragment) = match url.split_once('#') {
                Some((base, fragment)) => (base, Some(fragment)),
                None => (url, None),
            };
            let sep = if base.contains('?') { '&' } else { '?' };
            let mut out = format!("{base}{sep}{CACHE_BUST_PARAM}={value}");
            if let Some(fragment) = fragment {
                out.push('#');
                out.push_str(fragment);
            }
            out
        }
    }
}

/// Hands the replacement location to the embedding shell on stdout.
pub struct HostNavigator {
    current: String,
}

impl HostNavigator {
    pub fn new(current: impl Into<String>) -> Self {
        Self {
            current: current.into(),
        }
    }
}

impl Navigator for HostNavigator {
    fn current_url(&self) -> String {
        self.current.clone()
    }

    fn replace(&self, url: &str) -> Result<(), AppError> {
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "navigate {url}")?;
        stdout.flush()?;
        Ok(())
    }
}

/// Records navigations instead of performing them.
pub struct RecordingNavigator {
    current: String,
    calls: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    pub fn new(current: impl Into<String>) -> Self {
        Self {
            current: current.into(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

impl Navigator for RecordingNavigator {
    fn current_url(&self) -> String {
        self.current.clone()
    }

    fn replace(&self, url: &str) -> Result<(), AppError> {
        self.calls
            .lock()
            .map_err(|_| AppError::Internal("navigator lock poisoned".into()))?
            .push(url.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    #[test]
    fn bust_value_is_unique_and_timestamped() {
        let clock = ManualClock::new(1_700_000_000_000);
        let a = cache_bust_value(&clock);
        let b = cache_bust_value(&clock);
        assert!(a.starts_with("1700000000000-"));
        assert_ne!(a, b);
    }

    #[test]
    fn absolute_url_keeps_other_params_and_replaces_old_bust() {
        let out = cache_busted_url("https://app.example.com/day/3?lang=en&_cb=old#rec", "new");
        assert_eq!(out, "https://app.example.com/day/3?lang=en&_cb=new#rec");
    }

    #[test]
    fn absolute_url_without_query() {
        assert_eq!(
            cache_busted_url("https://app.example.com/", "x"),
            "https://app.example.com/?_cb=x"
        );
    }

    #[test]
    fn relative_url_appends() {
        assert_eq!(cache_busted_url("/day/3", "x"), "/day/3?_cb=x");
        assert_eq!(cache_busted_url("/day/3?lang=en#top", "x"), "/day/3?lang=en&_cb=x#top");
    }

    #[test]
    fn recording_navigator_keeps_calls() {
        let nav = RecordingNavigator::new("https://app.example.com/");
        nav.replace("https://app.example.com/?_cb=1").unwrap();
        assert_eq!(nav.calls(), vec!["https://app.example.com/?_cb=1".to_string()]);
        assert_eq!(nav.current_url(), "https://app.example.com/");
    }
}
