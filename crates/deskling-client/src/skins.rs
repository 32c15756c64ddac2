//! Built-in panel skins.

pub const DEFAULT_SKIN_ID: &str = "default_skin";

/// Colors applied to the desktop panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SkinPalette {
    pub panel_bg: &'static str,
    pub panel_border: &'static str,
    pub accent: &'static str,
}

impl SkinPalette {
    /// Style properties in application order.
    #[must_use]
    pub fn properties(&self) -> [(&'static str, &'static str); 3] {
        [
            ("--panel-bg", self.panel_bg),
            ("--panel-border", self.panel_border),
            ("--accent", self.accent),
        ]
    }
}

const SKINS: [(&str, SkinPalette); 3] = [
    (
        DEFAULT_SKIN_ID,
        SkinPalette {
            panel_bg: "rgba(7, 14, 28, 0.82)",
            panel_border: "rgba(238, 244, 255, 0.22)",
            accent: "#ff7a18",
        },
    ),
    (
        "mint_wave",
        SkinPalette {
            panel_bg: "rgba(7, 28, 24, 0.82)",
            panel_border: "rgba(187, 247, 208, 0.24)",
            accent: "#10b981",
        },
    ),
    (
        "ember_dawn",
        SkinPalette {
            panel_bg: "rgba(38, 14, 8, 0.82)",
            panel_border: "rgba(254, 215, 170, 0.26)",
            accent: "#fb923c",
        },
    ),
];

/// A resolved skin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppliedSkin {
    pub id: &'static str,
    pub palette: SkinPalette,
}

#[must_use]
pub fn lookup(skin_id: &str) -> Option<AppliedSkin> {
    SKINS
        .iter()
        .find(|(id, _)| *id == skin_id)
        .map(|(id, palette)| AppliedSkin {
            id: *id,
            palette: *palette,
        })
}

/// Resolve `skin_id`, falling back to the default skin for unknown ids.
#[must_use]
pub fn apply(skin_id: &str) -> AppliedSkin {
    lookup(skin_id).unwrap_or(AppliedSkin {
        id: DEFAULT_SKIN_ID,
        palette: SKINS[0].1,
    })
}

#[must_use]
pub fn skin_ids() -> Vec<&'static str> {
    SKINS.iter().map(|(id, _)| *id).collect()
}

#[cfg(test)]
mod tests {
    use super::{DEFAULT_SKIN_ID, apply, lookup, skin_ids};

    #[test]
    fn known_skins_resolve_to_their_palette() {
        let mint = apply("mint_wave");
        assert_eq!(mint.id, "mint_wave");
        assert_eq!(mint.palette.accent, "#10b981");

        let ember = apply("ember_dawn");
        assert_eq!(
            ember.palette.properties(),
            [
                ("--panel-bg", "rgba(38, 14, 8, 0.82)"),
                ("--panel-border", "rgba(254, 215, 170, 0.26)"),
                ("--accent", "#fb923c"),
            ]
        );
    }

    #[test]
    fn unknown_ids_fall_back_to_default() {
        for id in ["", "neon", "DEFAULT_SKIN", "mint_wave "] {
            let skin = apply(id);
            assert_eq!(skin.id, DEFAULT_SKIN_ID);
            assert_eq!(skin.palette.accent, "#ff7a18");
            assert!(lookup(id).is_none());
        }
    }

    #[test]
    fn skin_table_lists_default_first() {
        assert_eq!(skin_ids(), ["default_skin", "mint_wave", "ember_dawn"]);
    }
}
