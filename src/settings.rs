use std::path::{Path, PathBuf};

use image::Rgba;

use crate::canvas::{DEFAULT_HEIGHT, DEFAULT_WIDTH, WHITE};
use crate::components::tools::ToolKind;

const SETTINGS_FILE: &str = "canvasfe_settings.cfg";

/// Editor preferences, persisted as a `key=value` text file.
///
/// Settings are handed to [`crate::project::Project::new`] explicitly; the
/// editing core never reads them from disk itself.
#[derive(Clone, Debug, PartialEq)]
pub struct EditorSettings {
    /// Directory or file last used for import.  Empty when unset.
    pub last_open_path: String,
    pub last_tool: ToolKind,
    pub grid_visible: bool,
    pub canvas_width: u32,
    pub canvas_height: u32,
    pub background: Rgba<u8>,
    /// Maximum undo entries kept (initial state included).  0 = unbounded;
    /// 1 behaves as 2.
    pub max_undo_steps: usize,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            last_open_path: String::new(),
            last_tool: ToolKind::Select,
            grid_visible: false,
            canvas_width: DEFAULT_WIDTH,
            canvas_height: DEFAULT_HEIGHT,
            background: WHITE,
            max_undo_steps: 0,
        }
    }
}

impl EditorSettings {
    /// Path to the settings file.
    /// On Linux:   ~/.config/canvasfe/canvasfe_settings.cfg  (XDG_CONFIG_HOME respected)
    /// On Windows: %APPDATA%\CanvasFE\canvasfe_settings.cfg
    /// On macOS:   ~/Library/Application Support/CanvasFE/canvasfe_settings.cfg
    /// Fallback:   same directory as the executable.
    pub fn settings_path() -> Option<PathBuf> {
        #[cfg(target_os = "linux")]
        {
            let config_dir = std::env::var("XDG_CONFIG_HOME")
                .map(PathBuf::from)
                .unwrap_or_else(|_| {
                    let home = std::env::var("HOME").unwrap_or_else(|_| "~".to_string());
                    PathBuf::from(home).join(".config")
                })
                .join("canvasfe");
            return Some(config_dir.join(SETTINGS_FILE));
        }
        #[cfg(target_os = "windows")]
        {
            let appdata = std::env::var("APPDATA")
                .or_else(|_| std::env::var("USERPROFILE"))
                .ok()?;
            return Some(PathBuf::from(appdata).join("CanvasFE").join(SETTINGS_FILE));
        }
        #[cfg(target_os = "macos")]
        {
            let home = std::env::var("HOME").unwrap_or_else(|_| "~".to_string());
            return Some(
                PathBuf::from(home)
                    .join("Library")
                    .join("Application Support")
                    .join("CanvasFE")
                    .join(SETTINGS_FILE),
            );
        }
        #[cfg(not(any(target_os = "linux", target_os = "windows", target_os = "macos")))]
        {
            std::env::current_exe()
                .ok()
                .and_then(|p| p.parent().map(|d| d.join(SETTINGS_FILE)))
        }
    }

    /// Serialize a colour as "r,g,b,a"
    fn color_to_str(c: Rgba<u8>) -> String {
        format!("{},{},{},{}", c[0], c[1], c[2], c[3])
    }

    /// Parse a colour from "r,g,b,a"
    fn str_to_color(s: &str) -> Option<Rgba<u8>> {
        let parts: Vec<&str> = s.split(',').collect();
        if parts.len() == 4 {
            let r = parts[0].trim().parse::<u8>().ok()?;
            let g = parts[1].trim().parse::<u8>().ok()?;
            let b = parts[2].trim().parse::<u8>().ok()?;
            let a = parts[3].trim().parse::<u8>().ok()?;
            Some(Rgba([r, g, b, a]))
        } else {
            None
        }
    }

    pub fn to_config_string(&self) -> String {
        format!(
            "last_open_path={}\n\
             last_tool={}\n\
             grid_visible={}\n\
             canvas_width={}\n\
             canvas_height={}\n\
             background={}\n\
             max_undo_steps={}\n",
            self.last_open_path,
            self.last_tool.name(),
            self.grid_visible,
            self.canvas_width,
            self.canvas_height,
            Self::color_to_str(self.background),
            self.max_undo_steps,
        )
    }

    /// Parse file contents.  Unknown keys are ignored and malformed values
    /// keep their defaults.
    pub fn parse(content: &str) -> Self {
        let mut s = Self::default();
        for line in content.lines() {
            let Some((key, val)) = line.split_once('=') else { continue };
            let key = key.trim();
            let val = val.trim();
            match key {
                "last_open_path" => {
                    s.last_open_path = val.to_string();
                }
                "last_tool" => {
                    s.last_tool = ToolKind::from_name(val).unwrap_or_default();
                }
                "grid_visible" => {
                    s.grid_visible = val == "true";
                }
                "canvas_width" => {
                    s.canvas_width = val.parse().ok().filter(|&w| w > 0).unwrap_or(DEFAULT_WIDTH);
                }
                "canvas_height" => {
                    s.canvas_height = val.parse().ok().filter(|&h| h > 0).unwrap_or(DEFAULT_HEIGHT);
                }
                "background" => {
                    if let Some(c) = Self::str_to_color(val) {
                        s.background = c;
                    }
                }
                "max_undo_steps" => {
                    s.max_undo_steps = val.parse().unwrap_or(0);
                }
                _ => {}
            }
        }
        s
    }

    /// Load from `path`.  A missing or unreadable file gives the defaults.
    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::parse(&content),
            Err(_) => Self::default(),
        }
    }

    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        std::fs::write(path, self.to_config_string())
    }

    /// Load settings from disk (returns default if file missing or corrupt)
    pub fn load() -> Self {
        let Some(path) = Self::settings_path() else { return Self::default() };
        Self::load_from(&path)
    }

    /// Save settings to disk
    pub fn save(&self) {
        let Some(path) = Self::settings_path() else { return };
        if let Err(e) = self.save_to(&path) {
            crate::log_err!("failed to save settings to {}: {}", path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_string_parses_back() {
        let settings = EditorSettings {
            last_open_path: "/tmp/pictures".into(),
            last_tool: ToolKind::Crop,
            grid_visible: true,
            canvas_width: 640,
            canvas_height: 480,
            background: Rgba([10, 20, 30, 40]),
            max_undo_steps: 25,
        };
        assert_eq!(EditorSettings::parse(&settings.to_config_string()), settings);
    }

    #[test]
    fn bad_values_fall_back_to_defaults() {
        let s = EditorSettings::parse(
            "last_tool=lasso\ncanvas_width=0\ncanvas_height=abc\nbackground=1,2,3\nmystery=1\nno equals sign\n",
        );
        assert_eq!(s, EditorSettings::default());
    }
}
