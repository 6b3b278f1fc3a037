use super::*;

// Unique env var names per test to avoid races with parallel tests.

#[test]
fn env_parse_unset_returns_default() {
    assert_eq!(env_parse("__TEST_CFG_SURELY_UNSET_7781__", 42u16).unwrap(), 42);
}

#[test]
fn env_parse_reads_value() {
    let key = "__TEST_CFG_PORT_READ__";
    unsafe { std::env::set_var(key, " 9090 ") };
    assert_eq!(env_parse(key, 1u16).unwrap(), 9090);
    unsafe { std::env::remove_var(key) };
}

#[test]
fn env_parse_empty_returns_default() {
    let key = "__TEST_CFG_EMPTY__";
    unsafe { std::env::set_var(key, "") };
    assert_eq!(env_parse(key, 5u64).unwrap(), 5);
    unsafe { std::env::remove_var(key) };
}

#[test]
fn env_parse_invalid_is_error() {
    let key = "__TEST_CFG_INVALID__";
    unsafe { std::env::set_var(key, "eighty") };
    let err = env_parse(key, 1u16).unwrap_err();
    assert!(err.to_string().contains("__TEST_CFG_INVALID__"));
    unsafe { std::env::remove_var(key) };
}

#[test]
fn default_config_keeps_matches_forever() {
    let config = Config::default();
    assert_eq!(config.bind_addr(), "127.0.0.1:8080");
    assert!(config.match_idle_ttl.is_none());
    assert_eq!(config.sweep_interval, Duration::from_secs(60));
}
