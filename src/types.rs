use serde::Deserialize;

/// Canonical task name type used throughout the crate.
pub type TaskName = String;

/// What a watch binding does with changes that arrive while its task is
/// already running.
///
/// - `Queue`: remember them and run the task once more after the current run
///   finishes (default behaviour).
/// - `Drop`: ignore them; the running task is considered up to date.
///
/// Running tasks are never cancelled either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TriggeredWhileRunning {
    #[default]
    Queue,
    Drop,
}

/// Asset categories recognised in the `[paths.<category>]` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetCategory {
    Templates,
    Styles,
    Scripts,
    Images,
    Fonts,
    Files,
    Video,
    Demo,
}

impl AssetCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetCategory::Templates => "templates",
            AssetCategory::Styles => "styles",
            AssetCategory::Scripts => "scripts",
            AssetCategory::Images => "images",
            AssetCategory::Fonts => "fonts",
            AssetCategory::Files => "files",
            AssetCategory::Video => "video",
            AssetCategory::Demo => "demo",
        }
    }
}

impl std::fmt::Display for AssetCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
