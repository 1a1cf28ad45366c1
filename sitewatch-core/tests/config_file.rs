use std::time::Duration;

use sitewatch_core::MonitorConfig;

const EXAMPLE: &str = include_str!("../../sites.example.toml");

#[test]
fn test_example_config_parses() {
    let config = MonitorConfig::from_toml_str(EXAMPLE).unwrap();

    assert_eq!(config.sites.len(), 3);
    assert_eq!(config.enabled_sites().count(), 2);
    assert_eq!(config.settings.monitor_interval(), Duration::from_secs(1800));

    let example = &config.sites[0];
    assert!(example.check_keyword);
    assert_eq!(example.active_keyword(), Some("Example Domain"));
    assert_eq!(example.timeout, Duration::from_secs(10));

    let status = &config.sites[1];
    assert_eq!(status.expected_status, 204);
    assert!(!status.use_icmp);
    assert_eq!(status.timeout, Duration::from_secs(5));
}

#[test]
fn test_environment_overrides_example() {
    let config = MonitorConfig::from_toml_with_env(EXAMPLE, |key| match key {
        "MONITOR_INTERVAL" => Some("60".to_string()),
        "USE_ICMP_BY_DEFAULT" => Some("false".to_string()),
        "SCHEDULED_TIMES" => Some("08:00, 20:00".to_string()),
        _ => None,
    })
    .unwrap();

    assert_eq!(config.settings.monitor_interval, 60);
    assert_eq!(config.settings.scheduled_times, vec!["08:00", "20:00"]);
    assert!(!config.sites[0].use_icmp);
}
