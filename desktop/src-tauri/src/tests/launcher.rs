use crate::server::{RuntimeSettings, ServerLauncher, ShellError};

use std::path::PathBuf;

fn launcher(settings: &RuntimeSettings, resources: Option<PathBuf>, server_dir: PathBuf) -> ServerLauncher {
    ServerLauncher::new(settings, resources, server_dir)
}

#[test]
fn test_entry_invocation_targets_the_external_module() {
    assert_eq!(
        ServerLauncher::entry_invocation(),
        "import app_main; app_main.start_server()"
    );
}

#[test]
fn test_interpreter_override_wins() {
    let dir = tempfile::tempdir().unwrap();
    let fake_python = dir.path().join("python3");
    std::fs::write(&fake_python, "").unwrap();

    let settings = RuntimeSettings {
        python_path: Some(fake_python.clone()),
        app_dir: None,
    };
    let launcher = launcher(&settings, None, dir.path().to_path_buf());

    assert_eq!(launcher.resolve_interpreter().unwrap(), fake_python);
}

#[test]
fn test_app_dir_override_requires_entry_module() {
    let dir = tempfile::tempdir().unwrap();
    let app = dir.path().join("myapp");
    std::fs::create_dir_all(&app).unwrap();

    let settings = RuntimeSettings {
        python_path: None,
        app_dir: Some(app.clone()),
    };
    let launcher = launcher(&settings, None, dir.path().to_path_buf());

    // No app_main.py anywhere: nothing to launch
    match launcher.resolve_app_dir() {
        Err(ShellError::AppDirMissing { .. }) => {}
        Err(e) => panic!("unexpected error: {e}"),
        Ok(p) => panic!("unexpectedly resolved {}", p.display()),
    }

    std::fs::write(app.join("app_main.py"), "def start_server():\n    pass\n").unwrap();
    assert_eq!(launcher.resolve_app_dir().unwrap(), app);
}

#[test]
fn test_bundled_app_installs_into_server_dir() {
    let resources = tempfile::tempdir().unwrap();
    let bundled = resources.path().join("app");
    std::fs::create_dir_all(bundled.join("config")).unwrap();
    std::fs::write(bundled.join("app_main.py"), "def start_server():\n    pass\n").unwrap();
    std::fs::write(bundled.join("config").join("settings.py"), "DEBUG = False\n").unwrap();

    let server_dir = tempfile::tempdir().unwrap();
    let settings = RuntimeSettings::default();
    let launcher = launcher(
        &settings,
        Some(resources.path().to_path_buf()),
        server_dir.path().to_path_buf(),
    );

    let resolved = launcher.resolve_app_dir().unwrap();
    assert_eq!(resolved, server_dir.path().join("app"));
    assert!(resolved.join("app_main.py").exists());
    assert!(resolved.join("config").join("settings.py").exists());

    // Second resolve reuses the installed copy
    assert_eq!(launcher.resolve_app_dir().unwrap(), resolved);
}
