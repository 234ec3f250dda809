//! Integration tests for TOML and environment configuration loading.
//!
//! Uses `figment::Jail` for sandboxed file and env var manipulation.

use anno_config::{AnnoConfig, ConfigError};
use figment::{
    Figment, Jail,
    providers::{Env, Format, Serialized, Toml},
};
use pretty_assertions::assert_eq;

#[test]
fn loads_sections_from_toml() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "config.toml",
            r#"
[database]
path = "./buckeye.db"
foreign_keys = false

[closure]
separator = "|"

[alignment]
lookahead = 6

[query]
corpus = "buckeye"
"#,
        )?;

        let config: AnnoConfig = Figment::from(Serialized::defaults(AnnoConfig::default()))
            .merge(Toml::file("config.toml"))
            .extract()?;

        assert_eq!(config.database.path, "./buckeye.db");
        assert!(!config.database.foreign_keys);
        assert_eq!(config.closure.separator, "|");
        assert_eq!(config.alignment.window(), Some(6));
        assert_eq!(config.query.corpus, "buckeye");
        assert_eq!(config.import.progress_every, 20);
        Ok(())
    });
}

#[test]
fn project_file_is_picked_up_by_load() {
    Jail::expect_with(|jail| {
        jail.create_dir(".annograph")?;
        jail.create_file(
            ".annograph/config.toml",
            r#"
[query]
corpus = "timit"
"#,
        )?;

        let config = AnnoConfig::load().expect("config loads");
        assert_eq!(config.query.corpus, "timit");
        Ok(())
    });
}

#[test]
fn env_beats_project_file() {
    Jail::expect_with(|jail| {
        jail.create_dir(".annograph")?;
        jail.create_file(
            ".annograph/config.toml",
            r#"
[database]
path = "from-file.db"
"#,
        )?;
        jail.set_env("ANNOGRAPH_DATABASE__PATH", ":memory:");

        let config = AnnoConfig::load().expect("config loads");
        assert!(config.database.is_in_memory());
        Ok(())
    });
}

#[test]
fn env_only_figment_maps_nested_keys() {
    Jail::expect_with(|jail| {
        jail.set_env("ANNOGRAPH_CLOSURE__SEPARATOR", "+");
        jail.set_env("ANNOGRAPH_IMPORT__PROGRESS_EVERY", "5");

        let config: AnnoConfig = Figment::from(Serialized::defaults(AnnoConfig::default()))
            .merge(Env::prefixed("ANNOGRAPH_").split("__"))
            .extract()?;

        assert_eq!(config.closure.separator, "+");
        assert_eq!(config.import.progress_every, 5);
        Ok(())
    });
}

#[test]
fn load_rejects_zero_progress_interval() {
    Jail::expect_with(|jail| {
        jail.set_env("ANNOGRAPH_IMPORT__PROGRESS_EVERY", "0");

        let err = AnnoConfig::load().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "import.progress_every"));
        Ok(())
    });
}
