//! End-to-end lifecycle of a host: build, load, shutdown.

use std::path::Path;
use std::sync::Arc;

use hearth_core::{BoxError, BuildError, RegistryPhase, Service};
use hearth_plugin::{LoadedPlugin, PluginCatalog, PluginContext, PluginFailure};
use hearth_runtime::{HearthConfig, Host, HostState, RuntimeError};
use parking_lot::Mutex;

#[derive(Default)]
struct Journal(Mutex<Vec<String>>);

impl Journal {
    fn push(&self, entry: impl Into<String>) {
        self.0.lock().push(entry.into());
    }

    fn entries(&self) -> Vec<String> {
        self.0.lock().clone()
    }
}

struct Store {
    prefix: String,
}

fn write_unit(root: &Path, category: &str, file: &str, content: &str) {
    let dir = root.join(category);
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join(file), content).unwrap();
}

/// `tracker` records into the journal and reads the `store` service.
fn catalog() -> PluginCatalog {
    let mut catalog = PluginCatalog::new();
    catalog.register("tracker", |ctx: PluginContext| async move {
        let journal = ctx.resolve::<Journal>("journal")?;
        let store = ctx.resolve::<Store>("store")?;
        journal.push(format!("{}init:{}", store.prefix, ctx.name()));

        let name = ctx.name().to_string();
        Ok::<_, PluginFailure>(LoadedPlugin::new(ctx.name()).on_dispose(move || {
            let journal = Arc::clone(&journal);
            let name = name.clone();
            async move {
                journal.push(format!("dispose:{name}"));
                Ok(())
            }
        }))
    });
    catalog
}

fn config(plugin_dir: &Path, categories: &[&str]) -> HearthConfig {
    let mut config = HearthConfig::default();
    config.plugins.dir = plugin_dir.to_path_buf();
    config.plugins.categories = categories.iter().map(|c| c.to_string()).collect();
    config
}

fn register_services(host: &Host, journal: &Arc<Journal>) {
    let registry = host.registry();

    let hook_journal = Arc::clone(journal);
    registry
        .register_service(
            "journal",
            Service::from_arc(Arc::clone(journal)).on_release(move || {
                let journal = Arc::clone(&hook_journal);
                async move {
                    journal.push("dispose:journal");
                    Ok(())
                }
            }),
        )
        .unwrap();

    registry
        .register_factory("store", &["journal"], |deps| async move {
            let journal = deps.get::<Journal>("journal")?;
            journal.push("build:store");
            let hook_journal = Arc::clone(&journal);
            Ok::<_, BoxError>(
                Service::new(Store {
                    prefix: String::new(),
                })
                .on_release(move || {
                    let journal = Arc::clone(&hook_journal);
                    async move {
                        journal.push("dispose:store");
                        Ok(())
                    }
                }),
            )
        })
        .unwrap();
}

#[tokio::test]
async fn test_full_lifecycle_order() {
    let dir = tempfile::tempdir().unwrap();
    write_unit(dir.path(), "first", "a.toml", r#"initializer = "tracker""#);
    write_unit(dir.path(), "second", "b.toml", r#"initializer = "tracker""#);
    write_unit(dir.path(), "second", "c.toml", "enabled = false");

    let journal = Arc::new(Journal::default());
    let mut host = Host::with_catalog(config(dir.path(), &["first", "second"]), catalog()).unwrap();
    register_services(&host, &journal);
    assert_eq!(host.state(), HostState::Created);

    host.run_until(async {}).await.unwrap();

    assert_eq!(
        journal.entries(),
        vec![
            "build:store",
            "init:a",
            "init:b",
            "dispose:b",
            "dispose:a",
            "dispose:store",
            "dispose:journal",
        ]
    );
    assert_eq!(host.state(), HostState::Stopped);
    assert_eq!(host.registry().phase(), RegistryPhase::Disposed);

    let summaries = host.summaries();
    assert_eq!(summaries.len(), 2);
    assert_eq!((summaries[0].category.as_str(), summaries[0].loaded), ("first", 1));
    assert_eq!((summaries[1].loaded, summaries[1].skipped), (1, 1));

    // Shutting down twice is harmless.
    host.shutdown().await.unwrap();
    assert_eq!(journal.entries().len(), 7);
}

#[tokio::test]
async fn test_build_failure_releases_partial_services() {
    let dir = tempfile::tempdir().unwrap();
    write_unit(dir.path(), "first", "a.toml", r#"initializer = "tracker""#);

    let journal = Arc::new(Journal::default());
    let mut host = Host::with_catalog(config(dir.path(), &["first"]), catalog()).unwrap();
    register_services(&host, &journal);
    host.registry()
        .register_factory("broken", &["store"], |_| async {
            Err::<Service, BoxError>("no disk".into())
        })
        .unwrap();

    let err = host.start().await.unwrap_err();
    assert!(matches!(
        err,
        RuntimeError::Build(BuildError::Unresolvable { .. })
    ));

    assert_eq!(
        journal.entries(),
        vec!["build:store", "dispose:store", "dispose:journal"]
    );
    assert!(host.plugins().is_empty());
    assert_eq!(host.state(), HostState::Stopped);

    let err = host.start().await.unwrap_err();
    assert!(matches!(
        err,
        RuntimeError::State {
            action: "start",
            state: HostState::Stopped
        }
    ));
}

#[tokio::test]
async fn test_missing_service_fails_only_the_plugin() {
    let dir = tempfile::tempdir().unwrap();
    write_unit(dir.path(), "first", "a.toml", r#"initializer = "tracker""#);

    // No `store` registered: the initializer's resolve fails.
    let mut host = Host::with_catalog(config(dir.path(), &["first"]), catalog()).unwrap();
    host.registry()
        .register_instance("journal", Journal::default())
        .unwrap();

    let summaries = host.start().await.unwrap().to_vec();
    assert_eq!(summaries[0].failed, 1);
    assert_eq!(summaries[0].loaded, 0);
    assert_eq!(host.state(), HostState::Running);

    host.shutdown().await.unwrap();
}

#[test]
fn test_invalid_config_is_rejected() {
    let mut config = HearthConfig::default();
    config.plugins.categories = vec!["dup".into(), "dup".into()];
    let err = Host::with_catalog(config, PluginCatalog::new()).unwrap_err();
    assert!(matches!(err, RuntimeError::Config(_)));
}
