use core_logic::{ChainConfig, ConfigError};

// Each test uses its own chain suffix so parallel tests never share env vars.

#[test]
fn test_chain_config_from_env() {
    std::env::set_var("RPC_URL_CFGTEST_A", "https://rpc.saga.example");
    std::env::set_var("CONTRACT_ADDRESS_CFGTEST_A", "0x1111111111111111111111111111111111111111");
    std::env::set_var("PRIVATE_KEY_CFGTEST_A", "0xdeadbeef");
    std::env::set_var("CHAIN_ID_CFGTEST_A", "2717465680371000");

    let config = ChainConfig::from_env("cfgtest_a").unwrap();

    assert_eq!(config.name, "cfgtest_a");
    assert_eq!(config.rpc_url, "https://rpc.saga.example");
    assert_eq!(config.chain_id, Some(2717465680371000));
    assert_eq!(config.private_key.as_deref(), Some("0xdeadbeef"));
}

#[test]
fn test_missing_rpc_url_is_reported_by_name() {
    std::env::set_var("CONTRACT_ADDRESS_CFGTEST_B", "0x1111111111111111111111111111111111111111");

    match ChainConfig::from_env("cfgtest_b") {
        Err(ConfigError::MissingEnv { var }) => assert_eq!(var, "RPC_URL_CFGTEST_B"),
        other => panic!("Expected MissingEnv, got {:?}", other),
    }
}

#[test]
fn test_rejects_non_http_rpc_url() {
    std::env::set_var("RPC_URL_CFGTEST_C", "ws://localhost:8546");
    std::env::set_var("CONTRACT_ADDRESS_CFGTEST_C", "0x1111111111111111111111111111111111111111");

    assert!(matches!(
        ChainConfig::from_env("cfgtest_c"),
        Err(ConfigError::InvalidRpcUrl { .. })
    ));
}

#[test]
fn test_signer_required_variant() {
    std::env::set_var("RPC_URL_CFGTEST_D", "http://localhost:8545");
    std::env::set_var("CONTRACT_ADDRESS_CFGTEST_D", "0x1111111111111111111111111111111111111111");
    std::env::set_var("PRIVATE_KEY_CFGTEST_D", "   ");

    let read_only = ChainConfig::from_env("cfgtest_d").unwrap();
    assert!(read_only.private_key.is_none());

    match ChainConfig::from_env_with_signer("cfgtest_d") {
        Err(ConfigError::MissingEnv { var }) => assert_eq!(var, "PRIVATE_KEY_CFGTEST_D"),
        other => panic!("Expected MissingEnv, got {:?}", other),
    }
}

#[test]
fn test_debug_redacts_private_key() {
    let config = ChainConfig {
        name: "flow".to_string(),
        rpc_url: "https://testnet.evm.nodes.onflow.org".to_string(),
        chain_id: Some(545),
        contract_address: "0x2222222222222222222222222222222222222222".to_string(),
        private_key: Some("0xsecret".to_string()),
        legacy: false,
    };

    let rendered = format!("{:?}", config);
    assert!(!rendered.contains("0xsecret"));
    assert!(rendered.contains("REDACTED"));
}
