use jobtap_core::BrowserConfig;
use rand::Rng;

/// Flag that hides `navigator.webdriver` and related automation markers.
pub const AUTOMATION_CONTROLLED_FLAG: &str = "--disable-blink-features=AutomationControlled";

// Common desktop user agents
const USER_AGENTS: [&str; 3] = [
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
];

/// Fingerprint configuration for anti-detection
#[derive(Debug, Clone)]
pub struct FingerprintConfig {
    pub user_agent: String,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub launch_args: Vec<String>,
}

impl FingerprintConfig {
    /// Build the fingerprint for a configured browser. A configured user
    /// agent is used verbatim; otherwise one is picked at random.
    pub fn from_config(config: &BrowserConfig) -> Self {
        let user_agent = config
            .user_agent
            .clone()
            .unwrap_or_else(|| Self::random_user_agent().to_string());

        let mut launch_args = vec![AUTOMATION_CONTROLLED_FLAG.to_string()];
        launch_args.extend(
            config
                .extra_args
                .iter()
                .filter(|arg| arg.as_str() != AUTOMATION_CONTROLLED_FLAG)
                .cloned(),
        );

        Self {
            user_agent,
            viewport_width: config.window_width,
            viewport_height: config.window_height,
            launch_args,
        }
    }

    fn random_user_agent() -> &'static str {
        let mut rng = rand::thread_rng();
        USER_AGENTS[rng.gen_range(0..USER_AGENTS.len())]
    }
}
