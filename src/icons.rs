use std::collections::BTreeMap;

/// Icon collaborator: resolves a schema icon token to something drawable.
/// A miss is not an error; the surface simply draws no icon.
pub trait IconLookup {
    fn glyph(&self, token: &str) -> Option<&str>;
}

#[derive(Debug, Clone, Default)]
pub struct IconTable {
    glyphs: BTreeMap<String, String>,
}

impl IconTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, token: &str, glyph: &str) -> Self {
        self.glyphs.insert(token.to_string(), glyph.to_string());
        self
    }

    pub fn insert(&mut self, token: &str, glyph: &str) {
        self.glyphs.insert(token.to_string(), glyph.to_string());
    }

    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }

    /// A small text-glyph vocabulary that renders without icon fonts.
    pub fn builtin() -> Self {
        Self::new()
            .with("user", "\u{1F464}")
            .with("users", "\u{1F465}")
            .with("globe", "\u{1F310}")
            .with("shield", "\u{1F6E1}")
            .with("lock", "\u{1F512}")
            .with("key", "\u{1F511}")
            .with("server", "\u{1F5A5}")
            .with("database", "\u{1F5C4}")
            .with("cpu", "\u{2699}")
            .with("brain", "\u{1F9E0}")
            .with("bot", "\u{1F916}")
            .with("tool", "\u{1F527}")
            .with("cloud", "\u{2601}")
            .with("network", "\u{1F517}")
            .with("file", "\u{1F4C4}")
            .with("search", "\u{1F50D}")
            .with("eye", "\u{1F441}")
            .with("zap", "\u{26A1}")
            .with("layers", "\u{1F5C2}")
            .with("message", "\u{1F4AC}")
    }
}

impl IconLookup for IconTable {
    fn glyph(&self, token: &str) -> Option<&str> {
        let glyph = self.glyphs.get(token).map(String::as_str);
        if glyph.is_none() {
            tracing::debug!(token, "icon lookup miss");
        }
        glyph
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_tokens_resolve_to_nothing() {
        let icons = IconTable::builtin();
        assert!(icons.glyph("server").is_some());
        assert_eq!(icons.glyph("no-such-icon"), None);
        assert!(!icons.is_empty());
    }
}
