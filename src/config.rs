use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub const DEFAULT_BACKEND_URL: &str = "https://backend-i0h0.onrender.com";

pub fn key_match(key: &KeyEvent, bindings: &[String]) -> bool {
    bindings.iter().any(|binding| is_match(key, binding))
}

fn is_match(key: &KeyEvent, binding: &str) -> bool {
    let binding = binding.to_lowercase();

    let mut target_modifiers = KeyModifiers::NONE;
    let mut target_code = KeyCode::Null;

    for part in binding.split('+') {
        match part {
            "ctrl" => target_modifiers.insert(KeyModifiers::CONTROL),
            "opt" | "alt" => target_modifiers.insert(KeyModifiers::ALT),
            "shift" => target_modifiers.insert(KeyModifiers::SHIFT),
            "enter" => target_code = KeyCode::Enter,
            "esc" => target_code = KeyCode::Esc,
            "backspace" => target_code = KeyCode::Backspace,
            "tab" => target_code = KeyCode::Tab,
            "backtab" => target_code = KeyCode::BackTab,
            "space" => target_code = KeyCode::Char(' '),
            "up" => target_code = KeyCode::Up,
            "down" => target_code = KeyCode::Down,
            "left" => target_code = KeyCode::Left,
            "right" => target_code = KeyCode::Right,
            "delete" => target_code = KeyCode::Delete,
            c if c.chars().count() == 1 => {
                if let Some(ch) = c.chars().next() {
                    target_code = KeyCode::Char(ch);
                }
            }
            _ => {}
        }
    }

    // Char codes compare case-insensitively.
    let code_matches = if key.code == target_code {
        true
    } else if let (KeyCode::Char(c), KeyCode::Char(tc)) = (key.code, target_code) {
        c.to_lowercase().next() == Some(tc)
    } else {
        false
    };
    if !code_matches {
        return false;
    }

    // Enter matches modifiers exactly; other keys ignore Shift unless the binding asks for it.
    if target_code == KeyCode::Enter {
        return key.modifiers == target_modifiers;
    }

    let mut key_mods = key.modifiers;
    if !target_modifiers.contains(KeyModifiers::SHIFT) {
        key_mods.remove(KeyModifiers::SHIFT);
    }

    key_mods.contains(target_modifiers)
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "todoterm", "todoterm")
}

fn default_data_dir() -> PathBuf {
    if let Some(path) = std::env::var_os("TODOTERM_DATA_DIR") {
        return PathBuf::from(path);
    }
    if let Some(dirs) = project_dirs() {
        return dirs.data_dir().to_path_buf();
    }
    std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(".todoterm")
}

pub fn config_path() -> PathBuf {
    if let Some(path) = std::env::var_os("TODOTERM_CONFIG") {
        return PathBuf::from(path);
    }
    if let Some(dirs) = project_dirs() {
        return dirs.config_dir().join("config.toml");
    }
    std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(".todoterm-config.toml")
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub backend: BackendConfig,
    pub login: LoginConfig,
    pub data: DataConfig,
    pub keybindings: KeyBindings,
    pub theme: Theme,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct BackendConfig {
    pub base_url: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BACKEND_URL.to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct LoginConfig {
    /// External login service. The browser is sent to `{url}/?next={origin}`.
    pub url: String,
    /// Port for the local callback listener; 0 picks a free one.
    pub callback_port: u16,
    pub timeout_seconds: u64,
    pub open_browser: bool,
}

impl Default for LoginConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            callback_port: 0,
            timeout_seconds: 300,
            open_browser: true,
        }
    }
}

impl LoginConfig {
    /// `TODOTERM_LOGIN_URL` takes precedence over the file.
    pub fn resolved_url(&self) -> String {
        match std::env::var("TODOTERM_LOGIN_URL") {
            Ok(url) if !url.trim().is_empty() => url.trim().to_string(),
            _ => self.url.trim().to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct DataConfig {
    pub dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            dir: default_data_dir(),
        }
    }
}

impl DataConfig {
    pub fn log_dir(&self) -> PathBuf {
        self.dir.join("logs")
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct KeyBindings {
    pub global: GlobalBindings,
    pub lists: ListBindings,
    pub composer: ComposerBindings,
    pub popup: PopupBindings,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct GlobalBindings {
    pub quit: Vec<String>,
    pub help: Vec<String>,
    pub login: Vec<String>,
    pub logout: Vec<String>,
    pub refresh: Vec<String>,
    pub compose: Vec<String>,
    pub focus_next: Vec<String>,
}

impl Default for GlobalBindings {
    fn default() -> Self {
        Self {
            quit: vec!["ctrl+q".to_string(), "q".to_string()],
            help: vec!["?".to_string()],
            login: vec!["enter".to_string(), "l".to_string()],
            logout: vec!["shift+l".to_string()],
            refresh: vec!["r".to_string()],
            compose: vec!["a".to_string(), "i".to_string()],
            focus_next: vec!["tab".to_string(), "backtab".to_string()],
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct ListBindings {
    pub up: Vec<String>,
    pub down: Vec<String>,
    pub complete: Vec<String>,
    pub edit: Vec<String>,
    pub delete: Vec<String>,
}

impl Default for ListBindings {
    fn default() -> Self {
        Self {
            up: vec!["k".to_string(), "up".to_string()],
            down: vec!["j".to_string(), "down".to_string()],
            complete: vec!["space".to_string(), "c".to_string()],
            edit: vec!["e".to_string()],
            delete: vec!["d".to_string(), "delete".to_string()],
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct ComposerBindings {
    pub submit: Vec<String>,
    pub cancel: Vec<String>,
    pub next_field: Vec<String>,
    pub prev_field: Vec<String>,
    pub clear: Vec<String>,
}

impl Default for ComposerBindings {
    fn default() -> Self {
        Self {
            submit: vec!["enter".to_string()],
            cancel: vec!["esc".to_string()],
            next_field: vec!["tab".to_string(), "down".to_string()],
            prev_field: vec!["backtab".to_string(), "up".to_string()],
            clear: vec!["ctrl+l".to_string()],
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct PopupBindings {
    pub confirm: Vec<String>,
    pub cancel: Vec<String>,
}

impl Default for PopupBindings {
    fn default() -> Self {
        Self {
            confirm: vec!["enter".to_string(), "y".to_string()],
            cancel: vec!["esc".to_string(), "n".to_string()],
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct Theme {
    pub border_default: String,
    pub border_focus: String,
    pub border_editing: String,
    pub header: String,
    pub pending: String,
    pub completed: String,
    pub text_highlight: String,
    pub muted: String,
    pub toast_info: String,
    pub toast_error: String,
    pub alert: String,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            border_default: "Reset".to_string(),
            border_focus: "Cyan".to_string(),
            border_editing: "Green".to_string(),
            header: "#d3bbdd".to_string(),
            pending: "Yellow".to_string(),
            completed: "Green".to_string(),
            text_highlight: "50,50,50".to_string(),
            muted: "DarkGray".to_string(),
            toast_info: "Cyan".to_string(),
            toast_error: "LightRed".to_string(),
            alert: "Red".to_string(),
        }
    }
}

impl Config {
    /// Reads the config file, falling back to defaults. Problems are returned
    /// as messages because logging is not set up yet when this runs.
    pub fn load() -> (Self, Vec<String>) {
        let config_path = config_path();
        let mut warnings = Vec::new();

        let mut config = if let Ok(content) = fs::read_to_string(&config_path) {
            match toml::from_str::<Config>(&content) {
                Ok(config) => config,
                Err(e) => {
                    warnings.push(format!(
                        "Failed to parse config.toml ({}), using defaults: {e}",
                        config_path.display()
                    ));
                    Config::default()
                }
            }
        } else {
            Config::default()
        };

        let changed = config.normalize_paths();

        if (changed || !config_path.exists())
            && let Err(e) = config.save_to_path(&config_path)
        {
            warnings.push(format!(
                "Failed to write {}: {e}",
                config_path.display()
            ));
        }

        (config, warnings)
    }

    pub fn save_to_path(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        fs::write(path, content)
    }

    fn normalize_paths(&mut self) -> bool {
        let mut changed = false;

        if self.data.dir.as_os_str().is_empty() {
            self.data.dir = default_data_dir();
            changed = true;
        }

        if self.data.dir.is_relative() {
            self.data.dir = default_data_dir().join(&self.data.dir);
            changed = true;
        }

        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn key(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    #[test]
    fn matches_plain_and_modified_keys() {
        let quit = GlobalBindings::default().quit;
        assert!(key_match(&key(KeyCode::Char('q'), KeyModifiers::NONE), &quit));
        assert!(key_match(&key(KeyCode::Char('q'), KeyModifiers::CONTROL), &quit));
        assert!(!key_match(&key(KeyCode::Char('w'), KeyModifiers::NONE), &quit));
    }

    #[test]
    fn shift_only_matters_when_requested() {
        let logout = GlobalBindings::default().logout;
        assert!(key_match(&key(KeyCode::Char('L'), KeyModifiers::SHIFT), &logout));
        assert!(!key_match(&key(KeyCode::Char('l'), KeyModifiers::NONE), &logout));

        let help = GlobalBindings::default().help;
        assert!(key_match(&key(KeyCode::Char('?'), KeyModifiers::SHIFT), &help));
    }

    #[test]
    fn enter_requires_exact_modifiers() {
        let submit = ComposerBindings::default().submit;
        assert!(key_match(&key(KeyCode::Enter, KeyModifiers::NONE), &submit));
        assert!(!key_match(&key(KeyCode::Enter, KeyModifiers::SHIFT), &submit));
    }

    #[test]
    fn partial_file_keeps_defaults_for_missing_sections() {
        let config: Config = toml::from_str(
            r#"
            [backend]
            base_url = "http://localhost:5000"

            [login]
            url = "https://login.example.com"
            "#,
        )
        .expect("parse config");

        assert_eq!(config.backend.base_url, "http://localhost:5000");
        assert_eq!(config.login.url, "https://login.example.com");
        assert_eq!(config.login.timeout_seconds, 300);
        assert!(config.login.open_browser);
        assert_eq!(config.keybindings.lists.edit, vec!["e".to_string()]);
        assert_eq!(config.theme.pending, "Yellow");
    }

    #[test]
    fn saved_config_round_trips() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("nested").join("config.toml");
        let mut config = Config::default();
        config.backend.base_url = "http://127.0.0.1:9000".to_string();
        config.data.dir = dir.path().join("data");

        config.save_to_path(&path).expect("save config");
        let content = fs::read_to_string(&path).expect("read config");
        let loaded: Config = toml::from_str(&content).expect("parse saved config");

        assert_eq!(loaded.backend.base_url, "http://127.0.0.1:9000");
        assert_eq!(loaded.data.dir, dir.path().join("data"));
        assert_eq!(loaded.keybindings.global.quit, config.keybindings.global.quit);
    }

    #[test]
    fn relative_data_dir_is_anchored() {
        let mut config = Config::default();
        config.data.dir = PathBuf::from("relative");
        assert!(config.normalize_paths());
        assert!(config.data.dir.ends_with("relative"));
        assert_ne!(config.data.dir, PathBuf::from("relative"));

        config.data.dir = PathBuf::new();
        assert!(config.normalize_paths());
        assert!(!config.data.dir.as_os_str().is_empty());
    }
}
