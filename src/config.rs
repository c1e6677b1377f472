/// The node we talk to when no `--url` is given.
const DEFAULT_URL: &str = "wss://rpc.polkadot.io";

/// Settings for the one RPC connection made per invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    pub url: String,
}

impl ConnectionConfig {
    /// Use the URL given, falling back to the default endpoint.
    pub fn from_url(url: Option<&str>) -> Self {
        url.map(|url| ConnectionConfig { url: url.to_owned() })
            .unwrap_or_default()
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        ConnectionConfig {
            url: DEFAULT_URL.to_owned(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn falls_back_to_default_url() {
        assert_eq!(ConnectionConfig::from_url(None).url, "wss://rpc.polkadot.io");
        assert_eq!(
            ConnectionConfig::from_url(Some("ws://127.0.0.1:9944")).url,
            "ws://127.0.0.1:9944"
        );
    }
}
