use std::collections::BTreeMap;

/// Read-only view over a record's tag map with trimmed, non-empty lookups.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Tags<'a> {
    map: &'a BTreeMap<String, String>,
}

impl<'a> Tags<'a> {
    pub(crate) fn new(map: &'a BTreeMap<String, String>) -> Self {
        Self { map }
    }

    pub(crate) fn get(&self, key: &str) -> Option<&'a str> {
        self.map
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    pub(crate) fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub(crate) fn is(&self, key: &str, value: &str) -> bool {
        self.get(key).is_some_and(|v| v.eq_ignore_ascii_case(value))
    }

    pub(crate) fn is_any(&self, key: &str, values: &[&str]) -> bool {
        values.iter().any(|value| self.is(key, value))
    }

    /// First non-empty value among `keys`, in order.
    pub(crate) fn first_of<K: AsRef<str>>(&self, keys: &[K]) -> Option<&'a str> {
        keys.iter().find_map(|key| self.get(key.as_ref()))
    }

    /// Present with a value other than an explicit negative.
    pub(crate) fn enabled(&self, key: &str) -> bool {
        self.get(key).is_some_and(|v| {
            !matches!(
                v.to_ascii_lowercase().as_str(),
                "no" | "none" | "false" | "0"
            )
        })
    }

    /// Semicolon-separated list, underscores read as spaces, lowercased and deduplicated.
    pub(crate) fn list(&self, key: &str) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for item in self.get(key).unwrap_or_default().split(';') {
            let item = item.trim().replace('_', " ").to_lowercase();
            if !item.is_empty() && !out.contains(&item) {
                out.push(item);
            }
        }
        out
    }

    pub(crate) fn number(&self, key: &str) -> Option<u32> {
        let digits: String = self
            .get(key)?
            .chars()
            .take_while(char::is_ascii_digit)
            .collect();
        digits.parse().ok()
    }
}

/// Human label for a raw tag value such as `guest_house`.
pub(crate) fn humanize(value: &str) -> String {
    value.replace('_', " ")
}
