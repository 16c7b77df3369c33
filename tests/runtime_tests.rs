/// Runtime boot, hot-reload and language switching against a scratch copy
/// of the shipped assets.
use std::path::Path;
use std::time::{Duration, SystemTime};

use hydrangea_engine::core::config::EngineConfig;
use hydrangea_engine::core::content::ContentPaths;
use hydrangea_engine::core::runtime::Runtime;
use hydrangea_engine::core::session::{Command, Mode, SessionEvent};

fn scratch_assets() -> (tempfile::TempDir, ContentPaths) {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("assets");
    std::fs::create_dir_all(root.join("content")).unwrap();
    std::fs::create_dir_all(root.join("strings")).unwrap();
    std::fs::copy(
        "assets/content/scenes_demo.json",
        root.join("content/scenes_demo.json"),
    )
    .unwrap();
    for language in ["ua", "ru", "en"] {
        let name = format!("{language}.json");
        std::fs::copy(Path::new("assets/strings").join(&name), root.join("strings").join(&name))
            .unwrap();
    }
    std::fs::copy("assets/config.json", root.join("config.json")).unwrap();
    let paths = ContentPaths::under(&root);
    (dir, paths)
}

fn rewrite_config(path: &Path, config: &EngineConfig) {
    config.save(path).unwrap();
    let file = std::fs::File::options().write(true).open(path).unwrap();
    file.set_modified(SystemTime::now() + Duration::from_secs(30))
        .unwrap();
}

fn intro_title(runtime: &Runtime) -> Option<String> {
    runtime.session().dialog().and_then(|d| d.title.clone())
}

#[test]
fn boots_into_menu_in_configured_language() {
    let (_dir, paths) = scratch_assets();
    let runtime = Runtime::boot(paths).unwrap();
    assert_eq!(runtime.session().mode(), Mode::Menu);
    assert_eq!(runtime.session().language(), "ua");
    assert_eq!(runtime.config().lang, "ua");
}

#[test]
fn missing_config_boots_with_defaults() {
    let (_dir, paths) = scratch_assets();
    std::fs::remove_file(&paths.config).unwrap();
    let runtime = Runtime::boot(paths).unwrap();
    assert_eq!(runtime.config(), &EngineConfig::default());
}

#[test]
fn new_game_reaches_intro_after_fade() {
    let (_dir, paths) = scratch_assets();
    let mut runtime = Runtime::boot(paths).unwrap();
    runtime
        .session_mut()
        .handle_command(Command::MenuActivate)
        .unwrap();
    runtime.update(0.1).unwrap();
    assert!(runtime.session().dialog().is_none());
    runtime.update(0.2).unwrap();
    assert_eq!(intro_title(&runtime).as_deref(), Some("Гортензія"));
}

#[test]
fn config_change_reloads_language() {
    let (_dir, paths) = scratch_assets();
    let config_path = paths.config.clone();
    let mut runtime = Runtime::boot(paths).unwrap();
    runtime.session_mut().new_game().unwrap();
    runtime.update(0.3).unwrap();
    runtime.session_mut().drain_events();

    rewrite_config(
        &config_path,
        &EngineConfig {
            lang: "en".to_string(),
            ..EngineConfig::default()
        },
    );
    // The first update already used 0.3s of the poll interval.
    runtime.update(0.1).unwrap();
    assert_eq!(runtime.session().language(), "ua");
    runtime.update(0.15).unwrap();
    assert_eq!(runtime.session().language(), "en");
    assert_eq!(runtime.config().lang, "en");
    assert_eq!(intro_title(&runtime).as_deref(), Some("The Hydrangea"));
    assert!(runtime
        .session_mut()
        .drain_events()
        .contains(&SessionEvent::ContentReloaded {
            language: "en".to_string()
        }));
}

#[test]
fn broken_content_keeps_previous_generation() {
    let (_dir, paths) = scratch_assets();
    let config_path = paths.config.clone();
    let scenes_path = paths.scenes.clone();
    let mut runtime = Runtime::boot(paths).unwrap();
    runtime.session_mut().new_game().unwrap();
    runtime.update(0.3).unwrap();
    runtime.session_mut().nudge_stat(
        hydrangea_engine::schema::stats::StatKind::Anxiety,
        10.0,
    );
    let anxiety = runtime.session().stats().anxiety.target;

    std::fs::write(&scenes_path, "{ not json").unwrap();
    rewrite_config(
        &config_path,
        &EngineConfig {
            lang: "ru".to_string(),
            ..EngineConfig::default()
        },
    );
    runtime.update(0.6).unwrap();

    assert_eq!(runtime.session().language(), "ua");
    assert_eq!(intro_title(&runtime).as_deref(), Some("Гортензія"));
    assert!((runtime.session().stats().anxiety.target - anxiety).abs() < 0.1);
}

#[test]
fn set_language_persists_choice() {
    let (_dir, paths) = scratch_assets();
    let config_path = paths.config.clone();
    let mut runtime = Runtime::boot(paths).unwrap();
    runtime.set_language("ru").unwrap();
    assert_eq!(runtime.session().language(), "ru");
    assert_eq!(EngineConfig::load(&config_path).unwrap().lang, "ru");

    // Our own write is not picked up as an external change.
    runtime.session_mut().drain_events();
    runtime.update(0.6).unwrap();
    assert!(runtime.session_mut().drain_events().is_empty());
}

#[test]
fn set_language_normalizes_code() {
    let (_dir, paths) = scratch_assets();
    let config_path = paths.config.clone();
    let mut runtime = Runtime::boot(paths).unwrap();

    runtime.set_language("EN").unwrap();
    assert_eq!(runtime.session().language(), "en");
    assert_eq!(runtime.config().lang, "en");
    assert_eq!(EngineConfig::load(&config_path).unwrap().lang, "en");

    runtime.set_language("de").unwrap();
    assert_eq!(runtime.session().language(), "ua");
    assert_eq!(runtime.config().lang, "ua");
    assert_eq!(EngineConfig::load(&config_path).unwrap().lang, "ua");
}

#[test]
fn set_language_save_failure_keeps_everything() {
    let (_dir, paths) = scratch_assets();
    let config_path = paths.config.clone();
    let mut runtime = Runtime::boot(paths).unwrap();
    runtime.session_mut().new_game().unwrap();
    runtime.update(0.3).unwrap();
    runtime.session_mut().drain_events();

    // A directory in place of the config file makes the write fail.
    std::fs::remove_file(&config_path).unwrap();
    std::fs::create_dir(&config_path).unwrap();

    assert!(runtime.set_language("en").is_err());
    assert_eq!(runtime.session().language(), "ua");
    assert_eq!(runtime.config().lang, "ua");
    assert_eq!(intro_title(&runtime).as_deref(), Some("Гортензія"));
    assert!(runtime.session_mut().drain_events().is_empty());
}

#[test]
fn shutdown_writes_config() {
    let (_dir, paths) = scratch_assets();
    let config_path = paths.config.clone();
    std::fs::remove_file(&config_path).unwrap();
    let runtime = Runtime::boot(paths).unwrap();
    let session = runtime.shutdown().unwrap();
    assert_eq!(session.mode(), Mode::Menu);
    assert_eq!(EngineConfig::load(&config_path).unwrap(), EngineConfig::default());
}
