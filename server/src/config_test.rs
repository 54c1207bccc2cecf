use super::*;

/// Env vars are process-global; every test touching them holds this lock.
static ENV_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

/// # Safety
/// Callers must hold `ENV_LOCK`.
unsafe fn clear_server_env() {
    unsafe {
        std::env::remove_var("PORT");
        std::env::remove_var("HISTORY_LIMIT");
        std::env::remove_var("CLIENT_CHANNEL_CAPACITY");
        std::env::remove_var("TICKET_TTL_SECS");
    }
}

#[test]
fn from_env_uses_defaults() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
    unsafe { clear_server_env() };

    let cfg = ServerConfig::from_env().unwrap();
    assert_eq!(cfg, ServerConfig::default());
    assert_eq!(cfg.port, 3000);
}

#[test]
fn from_env_parses_overrides() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
    unsafe {
        clear_server_env();
        std::env::set_var("PORT", "8081");
        std::env::set_var("HISTORY_LIMIT", "5");
        std::env::set_var("CLIENT_CHANNEL_CAPACITY", "0");
        std::env::set_var("TICKET_TTL_SECS", " 30 ");
    }

    let cfg = ServerConfig::from_env().unwrap();
    assert_eq!(cfg.port, 8081);
    assert_eq!(cfg.history_limit, 5);
    assert_eq!(cfg.client_channel_capacity, 1);
    assert_eq!(cfg.ticket_ttl_secs, 30);

    unsafe { clear_server_env() };
}

#[test]
fn invalid_knobs_fall_back_but_invalid_port_fails() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
    unsafe {
        clear_server_env();
        std::env::set_var("HISTORY_LIMIT", "lots");
    }
    assert_eq!(ServerConfig::from_env().unwrap().history_limit, DEFAULT_HISTORY_LIMIT);

    unsafe { std::env::set_var("PORT", "99999") };
    let err = ServerConfig::from_env().unwrap_err();
    assert!(err.to_string().contains("99999"));

    unsafe { clear_server_env() };
}
