//! Commented default config written on first run.

pub(super) fn default_config_toml() -> String {
    r##"# paychat configuration
# Schema version 1
# Only override what you want to change -- missing fields use defaults.

[backend]
# base_url = "http://localhost:8010"   # PAYCHAT_API_URL overrides this
# connect_timeout_secs = 10            # 1-120
# request_timeout_secs = 120           # 1-600
# session_header = "X-Session-Id"

[session]
# store = "memory"                     # memory, file
# store_path = "/path/to/session.json" # only with store = "file"
# local_fallback = true

[logging]
# level = "INFO"                       # DEBUG, INFO, WARNING, ERROR
"##
    .to_string()
}
