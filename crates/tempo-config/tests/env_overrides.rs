use figment::Jail;
use pretty_assertions::assert_eq;
use tempo_config::TempoConfig;

#[test]
fn env_sets_database_path() {
    Jail::expect_with(|jail| {
        jail.set_env("TEMPO_DATABASE__PATH", "/tmp/tempo-test.db");
        let config = TempoConfig::load().expect("config loads");
        assert_eq!(config.database.path, "/tmp/tempo-test.db");
        Ok(())
    });
}

#[test]
fn env_toggles_foreign_keys() {
    Jail::expect_with(|jail| {
        jail.set_env("TEMPO_DATABASE__FOREIGN_KEYS", "false");
        let config = TempoConfig::load().expect("config loads");
        assert!(!config.database.foreign_keys);
        Ok(())
    });
}

#[test]
fn unrelated_env_is_ignored() {
    Jail::expect_with(|jail| {
        jail.set_env("OTHER_DATABASE__PATH", "/nowhere.db");
        let config = TempoConfig::load().expect("config loads");
        assert_eq!(config.database.path, ".tempo/tempo.db");
        Ok(())
    });
}

#[test]
fn dotenv_values_flow_through_figment() {
    Jail::expect_with(|jail| {
        // Registers the variable with the jail so it is restored on exit.
        jail.set_env("TEMPO_GENERAL__DEFAULT_LIMIT", "1");

        let dir = tempfile::tempdir().expect("tempdir");
        let env_path = dir.path().join(".env");
        std::fs::write(&env_path, "TEMPO_GENERAL__DEFAULT_LIMIT=7\n").expect("write .env");
        dotenvy::from_path_override(&env_path).expect("load .env");

        let config = TempoConfig::load().expect("config loads");
        assert_eq!(config.general.default_limit, 7);
        Ok(())
    });
}
