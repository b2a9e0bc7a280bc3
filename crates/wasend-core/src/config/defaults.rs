//! Default value functions used by serde for config deserialization.

pub fn default_name() -> String {
    "wasend".to_string()
}

pub fn default_data_dir() -> String {
    "~/.wasend".to_string()
}

pub fn default_log_level() -> String {
    "info".to_string()
}

pub fn default_true() -> bool {
    true
}

pub fn default_api_host() -> String {
    "0.0.0.0".to_string()
}

pub fn default_api_port() -> u16 {
    8080
}

pub fn default_web_dir() -> String {
    "web".to_string()
}

pub fn default_cooldown_secs() -> u64 {
    15
}

pub fn default_max_attempts() -> u32 {
    5
}

pub fn default_max_cooldown_secs() -> u64 {
    300
}

pub fn default_retry_delay_secs() -> u64 {
    8
}

pub fn default_max_auto_retries() -> u32 {
    3
}

pub fn default_qr_scale() -> u32 {
    8
}

pub fn default_device_name() -> String {
    "wasend".to_string()
}

pub fn default_bulk_delay_ms() -> u64 {
    2000
}

pub fn default_max_bulk_recipients() -> usize {
    500
}

pub fn default_max_message_len() -> usize {
    4096
}
