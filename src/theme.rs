use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Theme {
    pub font_family: String,
    pub font_size: f32,
    pub background: String,
    pub text_color: String,
    pub muted_text_color: String,
    pub node_fill: String,
    pub node_border: String,
    pub layer_border: String,
    pub line_color: String,
    pub label_background: String,
    pub threat_badge_fill: String,
    pub threat_badge_text: String,
    pub auth_badge_fill: String,
    pub auth_badge_text: String,
    /// Layer band fills, used in order when a layer carries no color token.
    pub layer_palette: Vec<String>,
}

impl Theme {
    pub fn classic() -> Self {
        Self {
            font_family: "\"trebuchet ms\", verdana, arial, sans-serif".to_string(),
            font_size: 14.0,
            background: "#FFFFFF".to_string(),
            text_color: "#333333".to_string(),
            muted_text_color: "#666666".to_string(),
            node_fill: "#ECECFF".to_string(),
            node_border: "#9370DB".to_string(),
            layer_border: "#AAAA33".to_string(),
            line_color: "#333333".to_string(),
            label_background: "#E8E8E8".to_string(),
            threat_badge_fill: "#FDE2E1".to_string(),
            threat_badge_text: "#B42318".to_string(),
            auth_badge_fill: "#DCFCE7".to_string(),
            auth_badge_text: "#166534".to_string(),
            layer_palette: vec![
                "#FFFFDE".to_string(),
                "#ECECFF".to_string(),
                "#E8F5E9".to_string(),
                "#FFF3E0".to_string(),
            ],
        }
    }

    pub fn modern() -> Self {
        Self {
            font_family: "Inter, Segoe UI, system-ui, -apple-system, sans-serif".to_string(),
            font_size: 13.0,
            background: "#FFFFFF".to_string(),
            text_color: "#1C2430".to_string(),
            muted_text_color: "#5B6678".to_string(),
            node_fill: "#FFFFFF".to_string(),
            node_border: "#C7D2E5".to_string(),
            layer_border: "#D7E0F0".to_string(),
            line_color: "#7A8AA6".to_string(),
            label_background: "#FFFFFF".to_string(),
            threat_badge_fill: "#FEF2F2".to_string(),
            threat_badge_text: "#DC2626".to_string(),
            auth_badge_fill: "#F0FDF4".to_string(),
            auth_badge_text: "#15803D".to_string(),
            layer_palette: vec![
                "#F7FAFF".to_string(),
                "#F5F3FF".to_string(),
                "#F0FDF4".to_string(),
                "#FFF7ED".to_string(),
                "#F8FAFC".to_string(),
            ],
        }
    }

    /// Resolves a layer color token: a literal `#hex`, a named token, or the
    /// palette entry for the layer's index.
    pub fn layer_fill(&self, token: Option<&str>, index: usize) -> String {
        match token.map(str::trim) {
            Some(hex) if hex.starts_with('#') => hex.to_string(),
            Some("blue") => "#EFF6FF".to_string(),
            Some("purple") => "#F5F3FF".to_string(),
            Some("green") => "#F0FDF4".to_string(),
            Some("orange") => "#FFF7ED".to_string(),
            Some("red") => "#FEF2F2".to_string(),
            Some("slate") => "#F8FAFC".to_string(),
            _ => self
                .layer_palette
                .get(index % self.layer_palette.len().max(1))
                .cloned()
                .unwrap_or_else(|| self.background.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layer_fill_resolution() {
        let theme = Theme::modern();
        assert_eq!(theme.layer_fill(Some("#123456"), 0), "#123456");
        assert_eq!(theme.layer_fill(Some("green"), 3), "#F0FDF4");
        assert_eq!(theme.layer_fill(None, 1), theme.layer_palette[1]);
        assert_eq!(theme.layer_fill(Some("unknown"), 5), theme.layer_palette[0]);
    }
}
