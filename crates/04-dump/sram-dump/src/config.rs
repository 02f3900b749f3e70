use cart_window::WindowConfig;

/// Orchestrator configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DumpConfig {
    /// Device name handed to the serial driver.
    pub channel_name: String,
    /// Addresses of the mapping window.
    pub window: WindowConfig,
    /// Set when console text ends up on the transfer channel; console output
    /// is then held back while the channel is raw.
    pub console_shares_channel: bool,
}

impl Default for DumpConfig {
    fn default() -> Self {
        Self {
            channel_name: "#SER0".to_string(),
            window: WindowConfig::default(),
            console_shares_channel: false,
        }
    }
}
