use std::path::PathBuf;

#[derive(Clone)]
pub struct AppConfig {
    pub app_name: String,
    pub seed: Option<PathBuf>,
    pub reminder_hour: u8,
    pub vapid_private_key: Option<String>,
    pub vapid_subject: Option<String>,
}

#[cfg(test)]
impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app_name: "Herald".to_string(),
            seed: None,
            reminder_hour: 10,
            vapid_private_key: None,
            vapid_subject: None,
        }
    }
}
