use std::time::Duration;

use reqwest::blocking::Client;

const DISABLE_SYSTEM_PROXY_ENV: &str = "DESKSTREAM_DISABLE_SYSTEM_PROXY";

/// Default read timeout for the vendor call. Generation can take a while,
/// but an unbounded wait would pin the bridge worker forever.
pub(crate) const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(120);

pub(crate) fn build_blocking_client(timeout: Duration) -> Client {
    let mut builder = Client::builder().timeout(timeout);

    if should_disable_system_proxy() {
        builder = builder.no_proxy();
    }

    builder.build().expect("Failed to build reqwest client")
}

fn should_disable_system_proxy() -> bool {
    if std::env::var_os(DISABLE_SYSTEM_PROXY_ENV).is_some() {
        return true;
    }

    cfg!(test)
}
