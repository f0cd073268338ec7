use std::path::PathBuf;

/// Directory name shared by the config and data locations.
const APP_DIR: &str = "lcd-meter";

pub const DEFAULT_LCD_DEVICE: &str = "/dev/lcd0";

pub fn data_dir() -> PathBuf {
    // Use ~/.local/share/lcd-meter/ (XDG standard) on every unix, including macOS
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join(".local")
        .join("share")
        .join(APP_DIR)
}

pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join(APP_DIR)
}

pub fn temp_dir() -> PathBuf {
    std::env::temp_dir()
}

/// Where the control FIFO lives unless configured otherwise.
pub fn default_fifo_path() -> PathBuf {
    temp_dir().join("lcd-meter.fifo")
}

pub fn log_path() -> PathBuf {
    data_dir().join("meter.log")
}
