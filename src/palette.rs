//! Fabric palette: display color name to reference texture file.
use std::path::{Path, PathBuf};

pub const COLOR_FABRIC_MAP: &[(&str, &str)] = &[
    ("Midnight Green", "Midnight Green New.jpg"),
    ("Charcoal Drift", "Charcoal Drift.jpg"),
    ("Burl Wood", "BURL WOOD.jpg"),
    ("Sage Green", "Sage Green New.jpg"),
    ("Pacific Blue", "Pacific Blue New.jpg"),
    ("Angora White", "Angora White New.jpg"),
    ("Oatmeal", "Oatmeal New.jpg"),
    ("Misty Lilac", "Misty Lilac New.jpg"),
    ("Rose Wood", "ROSE WOOD.jpg"),
    ("Berry Blush", "Berry Blush New.jpg"),
    ("Sunbrunt Yellow", "Sunbrunt Yellow New.jpg"),
    ("Olive Mist", "OLIVE MIST .jpg"),
    ("Muted Lime", "MUTED LIME.jpg"),
    ("Muted Mocha", "Muted Mocha New.jpg"),
    ("Brown Bean", "Brown Bean New.jpg"),
    ("Petal Pink", "Petal Pink New.jpg"),
    ("Wild Wind", "WILD WIND.jpg"),
];

/// Texture file name for an exact palette key.
pub fn texture_for(color: &str) -> Option<&'static str> {
    COLOR_FABRIC_MAP.iter().find(|(name, _)| *name == color).map(|(_, file)| *file)
}

pub fn texture_path(texture_dir: &Path, color: &str) -> Option<PathBuf> {
    texture_for(color).map(|file| texture_dir.join(file))
}

pub fn color_names() -> impl Iterator<Item = &'static str> {
    COLOR_FABRIC_MAP.iter().map(|(name, _)| *name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_exact() {
        assert_eq!(texture_for("Burl Wood"), Some("BURL WOOD.jpg"));
        assert_eq!(texture_for("Olive Mist"), Some("OLIVE MIST .jpg"));
        assert_eq!(texture_for("burl wood"), None);
        assert_eq!(texture_for("Teal"), None);
    }

    #[test]
    fn palette_has_seventeen_colors() {
        assert_eq!(color_names().count(), 17);
    }

    #[test]
    fn texture_path_joins_the_texture_dir() {
        let p = texture_path(Path::new("static/textures"), "Oatmeal").unwrap();
        assert_eq!(p, Path::new("static/textures").join("Oatmeal New.jpg"));
    }
}
