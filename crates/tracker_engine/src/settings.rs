use std::time::Duration;

/// Placeholder substituted with the job identifier in `preload_path`.
pub const FILE_ID_PLACEHOLDER: &str = "{fileid}";

#[derive(Debug, Clone)]
pub struct ApiSettings {
    /// Site root every endpoint path is resolved against.
    pub base_url: String,
    pub preview_path: String,
    pub commit_path: String,
    pub progress_path: String,
    /// Path template containing `{fileid}`.
    pub preload_path: String,
    pub hit_path: String,
    /// Anti-forgery token attached to every state-changing request.
    pub xsrf_token: Option<String>,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    /// Commit waits for the whole server-side download, so it gets its own
    /// (much longer) timeout.
    pub commit_timeout: Duration,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/".to_string(),
            preview_path: "/preview".to_string(),
            commit_path: "/download".to_string(),
            progress_path: "/progress".to_string(),
            preload_path: format!("/preload/{FILE_ID_PLACEHOLDER}/"),
            hit_path: "/hit".to_string(),
            xsrf_token: None,
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            commit_timeout: Duration::from_secs(15 * 60),
        }
    }
}

impl ApiSettings {
    pub fn preload_path_for(&self, file_id: &str) -> String {
        self.preload_path.replace(FILE_ID_PLACEHOLDER, file_id)
    }
}
