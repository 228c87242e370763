mod config;
mod display;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use colored::Colorize;
use log::{debug, info};

use yugaform_core::differ::{create_plan, validate_resource};
use yugaform_core::effect::Effect;
use yugaform_core::interpreter::{Bindings, EffectOutcome, Interpreter};
use yugaform_core::plan::Plan;
use yugaform_core::provider::Provider;
use yugaform_core::resource::{Resource, ResourceId, State, fill_missing_attributes};
use yugaform_core::schema::ResourceSchema;
use yugaform_provider_yba::credentials::process_env;
use yugaform_provider_yba::{PROVIDER_NAME, ProviderConfig, YbaProvider};
use yugaform_state::{Operation, StateBackend, StateFile, create_backend};

use config::{Configuration, DEFAULT_CONFIG_FILE};
use display::{format_effect, print_plan};

#[derive(Parser)]
#[command(name = "yugaform")]
#[command(about = "Declarative management of YugabyteDB Anywhere resources", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the configuration file
    Validate {
        /// Path to configuration file
        #[arg(default_value = DEFAULT_CONFIG_FILE)]
        file: PathBuf,
    },
    /// Show execution plan without applying changes
    Plan {
        /// Path to configuration file
        #[arg(default_value = DEFAULT_CONFIG_FILE)]
        file: PathBuf,
    },
    /// Apply changes to reach the desired state
    Apply {
        /// Path to configuration file
        #[arg(default_value = DEFAULT_CONFIG_FILE)]
        file: PathBuf,
    },
    /// Destroy every resource recorded in state
    Destroy {
        /// Path to configuration file
        #[arg(default_value = DEFAULT_CONFIG_FILE)]
        file: PathBuf,

        /// Skip confirmation prompt (auto-approve)
        #[arg(long)]
        auto_approve: bool,
    },
    /// Adopt an existing platform object into state
    Import {
        /// Resource type (e.g. universe)
        resource_type: String,
        /// Resource name as declared in the configuration
        name: String,
        /// Platform identifier (UUID, or the version for releases)
        identifier: String,

        /// Path to configuration file
        #[arg(long, short, default_value = DEFAULT_CONFIG_FILE)]
        file: PathBuf,
    },
    /// State inspection and maintenance
    State {
        #[command(subcommand)]
        command: StateCommands,
    },
}

#[derive(Subcommand)]
enum StateCommands {
    /// List recorded resources
    List {
        /// Path to configuration file
        #[arg(long, short, default_value = DEFAULT_CONFIG_FILE)]
        file: PathBuf,
    },
    /// Release a lock left behind by an interrupted run
    Unlock {
        /// Lock ID reported by the failed run
        lock_id: String,

        /// Path to configuration file
        #[arg(long, short, default_value = DEFAULT_CONFIG_FILE)]
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let result = match cli.command {
        Commands::Validate { file } => run_validate(&file),
        Commands::Plan { file } => run_plan(&file).await,
        Commands::Apply { file } => run_apply(&file).await,
        Commands::Destroy { file, auto_approve } => run_destroy(&file, auto_approve).await,
        Commands::Import {
            resource_type,
            name,
            identifier,
            file,
        } => run_import(&file, ResourceId::new(resource_type, name), &identifier).await,
        Commands::State { command } => match command {
            StateCommands::List { file } => run_state_list(&file).await,
            StateCommands::Unlock { lock_id, file } => run_state_unlock(&file, &lock_id).await,
        },
    };

    if let Err(e) = result {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn get_schemas(provider: &dyn Provider) -> HashMap<String, ResourceSchema> {
    provider
        .resource_types()
        .iter()
        .map(|t| (t.name().to_string(), t.schema()))
        .collect()
}

fn get_provider(config: &Configuration) -> Result<Box<dyn Provider>, String> {
    let settings = ProviderConfig::from_json(config.provider.as_ref(), process_env)
        .map_err(|e| e.to_string())?;
    debug!("Using platform at {}", settings.host);
    let provider = YbaProvider::new(settings).map_err(|e| e.to_string())?;
    Ok(Box::new(provider))
}

fn run_validate(file: &Path) -> Result<(), String> {
    let config = config::load(file)?;
    let resource_types = yugaform_provider_yba::resources::resource_types();

    let mut errors = Vec::new();
    for resource in &config.resources {
        match resource_types
            .iter()
            .find(|t| t.name() == resource.id.resource_type)
        {
            Some(resource_type) => {
                let schema = resource_type.schema();
                for issue in validate_resource(resource, None, resource_type.as_ref(), &schema) {
                    errors.push(issue.to_string());
                }
            }
            None => errors.push(format!(
                "{}: Unknown resource type '{}'",
                resource.id, resource.id.resource_type
            )),
        }
    }

    if !errors.is_empty() {
        for error in &errors {
            eprintln!("  {} {}", "✗".red(), error);
        }
        return Err(format!("{} validation error(s)", errors.len()));
    }

    println!(
        "{} {} resource(s) valid",
        "✓".green(),
        config.resources.len()
    );
    Ok(())
}

/// Re-read every recorded resource from the platform. Resources that no
/// longer exist are left out; write-only values are kept from state.
async fn refresh(provider: &dyn Provider, state: &StateFile) -> Result<Vec<State>, String> {
    let mut current = Vec::new();
    for prior in state.to_states() {
        let mut refreshed = provider
            .read(&prior.id, prior.identifier.as_deref(), Some(&prior))
            .await
            .map_err(|e| format!("Failed to refresh state: {}", e))?;
        if !refreshed.exists {
            info!("{} no longer exists on the platform", prior.id);
            continue;
        }
        fill_missing_attributes(&mut refreshed.attributes, &prior.attributes);
        if refreshed.identifier.is_none() {
            refreshed.identifier = prior.identifier.clone();
        }
        current.push(refreshed);
    }
    Ok(current)
}

/// Compute the plan for the declared resources against refreshed state
fn build_plan(
    provider: &dyn Provider,
    resources: &[Resource],
    current: &[State],
) -> Result<Plan, String> {
    let bindings = Bindings::from_states(current);
    let resolved: Vec<Resource> = resources
        .iter()
        .map(|r| Resource {
            id: r.id.clone(),
            attributes: r
                .attributes
                .iter()
                .map(|(k, v)| (k.clone(), bindings.resolve(v)))
                .collect(),
        })
        .collect();

    create_plan(&resolved, current, &provider.resource_types()).map_err(|e| e.to_string())
}

async fn run_plan(file: &Path) -> Result<(), String> {
    let config = config::load(file)?;
    let provider = get_provider(&config)?;
    let backend = create_backend(&config.backend).map_err(|e| e.to_string())?;

    let lock = backend
        .acquire_lock(Operation::Plan)
        .await
        .map_err(|e| e.to_string())?;
    let result = plan_locked(&config, provider.as_ref(), backend.as_ref()).await;
    backend
        .release_lock(&lock)
        .await
        .map_err(|e| e.to_string())?;
    result
}

async fn plan_locked(
    config: &Configuration,
    provider: &dyn Provider,
    backend: &dyn StateBackend,
) -> Result<(), String> {
    let state = backend
        .read_state()
        .await
        .map_err(|e| e.to_string())?
        .unwrap_or_default();
    let current = refresh(provider, &state).await?;
    let plan = build_plan(provider, &config.resources, &current)?;
    print_plan(&plan, &get_schemas(provider));
    Ok(())
}

async fn run_apply(file: &Path) -> Result<(), String> {
    let config = config::load(file)?;
    let provider = get_provider(&config)?;
    let backend = create_backend(&config.backend).map_err(|e| e.to_string())?;

    let lock = backend
        .acquire_lock(Operation::Apply)
        .await
        .map_err(|e| e.to_string())?;
    let result = apply_locked(&config, provider, backend.as_ref()).await;
    backend
        .release_lock(&lock)
        .await
        .map_err(|e| e.to_string())?;
    result
}

async fn apply_locked(
    config: &Configuration,
    provider: Box<dyn Provider>,
    backend: &dyn StateBackend,
) -> Result<(), String> {
    let mut state = backend
        .read_state()
        .await
        .map_err(|e| e.to_string())?
        .unwrap_or_default();

    let current = refresh(provider.as_ref(), &state).await?;
    let plan = build_plan(provider.as_ref(), &config.resources, &current)?;
    print_plan(&plan, &get_schemas(provider.as_ref()));
    if plan.is_empty() {
        return Ok(());
    }

    println!();
    println!("{}", "Applying changes...".cyan().bold());
    println!();

    // Refreshed values replace what was recorded before any effect runs
    for recorded in state.to_states() {
        match current.iter().find(|s| s.id == recorded.id) {
            Some(refreshed) => state.record(refreshed, PROVIDER_NAME),
            None => {
                state.remove_resource(&recorded.id);
            }
        }
    }

    let mut interpreter = Interpreter::new(provider).with_bindings(Bindings::from_states(&current));
    execute_plan(&mut interpreter, &plan, &mut state, backend).await
}

/// Run effects in order, persisting state after each one. Stops at the
/// first failure.
async fn execute_plan<P: Provider>(
    interpreter: &mut Interpreter<P>,
    plan: &Plan,
    state: &mut StateFile,
    backend: &dyn StateBackend,
) -> Result<(), String> {
    let mut success_count = 0;

    for effect in plan.effects() {
        match interpreter.execute_effect(effect).await {
            Ok(outcome) => {
                match &outcome {
                    EffectOutcome::Deleted { id } => {
                        state.remove_resource(id);
                    }
                    other => {
                        if let Some(new_state) = other.state() {
                            state.record(new_state, PROVIDER_NAME);
                        }
                    }
                }
                state.increment_serial();
                backend
                    .write_state(state)
                    .await
                    .map_err(|e| format!("Failed to save state: {}", e))?;
                println!("  {} {}", "✓".green(), format_effect(effect));
                success_count += 1;
            }
            Err(e) => {
                println!("  {} {} - {}", "✗".red(), format_effect(effect), e);
                println!();
                return Err(format!(
                    "Apply failed: {} succeeded, {} not attempted",
                    success_count,
                    plan.effects().len() - success_count - 1
                ));
            }
        }
    }

    println!();
    println!(
        "{}",
        format!("Apply complete! {} change(s) applied.", success_count)
            .green()
            .bold()
    );
    Ok(())
}

async fn run_destroy(file: &Path, auto_approve: bool) -> Result<(), String> {
    let config = config::load(file)?;
    let provider = get_provider(&config)?;
    let backend = create_backend(&config.backend).map_err(|e| e.to_string())?;

    let lock = backend
        .acquire_lock(Operation::Destroy)
        .await
        .map_err(|e| e.to_string())?;
    let result = destroy_locked(provider, backend.as_ref(), auto_approve).await;
    backend
        .release_lock(&lock)
        .await
        .map_err(|e| e.to_string())?;
    result
}

async fn destroy_locked(
    provider: Box<dyn Provider>,
    backend: &dyn StateBackend,
    auto_approve: bool,
) -> Result<(), String> {
    let mut state = backend
        .read_state()
        .await
        .map_err(|e| e.to_string())?
        .unwrap_or_default();

    if state.resources.is_empty() {
        println!("{}", "No resources to destroy.".green());
        return Ok(());
    }

    let mut plan = Plan::new();
    for recorded in state.to_states().into_iter().rev() {
        plan.add(Effect::Delete {
            id: recorded.id.clone(),
            from: recorded,
        });
    }

    println!("{}", "Destroy Plan:".red().bold());
    println!();
    for effect in plan.effects() {
        println!("  {} {}", "-".red().bold(), effect.resource_id());
    }
    println!();
    println!("Plan: {} to destroy.", plan.effects().len().to_string().red());
    println!();

    if !auto_approve {
        println!(
            "{}",
            "Do you really want to destroy all resources?"
                .yellow()
                .bold()
        );
        println!(
            "  {}",
            "This action cannot be undone. Type 'yes' to confirm.".yellow()
        );
        print!("\n  Enter a value: ");
        std::io::Write::flush(&mut std::io::stdout()).map_err(|e| e.to_string())?;

        let mut input = String::new();
        std::io::stdin()
            .read_line(&mut input)
            .map_err(|e| e.to_string())?;

        if input.trim() != "yes" {
            println!();
            println!("{}", "Destroy cancelled.".yellow());
            return Ok(());
        }
        println!();
    }

    println!("{}", "Destroying resources...".red().bold());
    println!();

    let mut interpreter = Interpreter::new(provider);
    execute_plan(&mut interpreter, &plan, &mut state, backend).await
}

async fn run_import(file: &Path, id: ResourceId, identifier: &str) -> Result<(), String> {
    let config = config::load(file)?;
    let provider = get_provider(&config)?;
    if !provider
        .resource_types()
        .iter()
        .any(|t| t.name() == id.resource_type)
    {
        return Err(format!("Unknown resource type '{}'", id.resource_type));
    }
    let backend = create_backend(&config.backend).map_err(|e| e.to_string())?;

    let lock = backend
        .acquire_lock(Operation::Import)
        .await
        .map_err(|e| e.to_string())?;
    let result = import_locked(provider.as_ref(), backend.as_ref(), &id, identifier).await;
    backend
        .release_lock(&lock)
        .await
        .map_err(|e| e.to_string())?;
    result
}

async fn import_locked(
    provider: &dyn Provider,
    backend: &dyn StateBackend,
    id: &ResourceId,
    identifier: &str,
) -> Result<(), String> {
    let mut state = backend
        .read_state()
        .await
        .map_err(|e| e.to_string())?
        .unwrap_or_default();
    if state.find_resource(id).is_some() {
        return Err(format!("{} is already managed", id));
    }

    let imported = provider
        .import(id, identifier)
        .await
        .map_err(|e| e.to_string())?;
    if !imported.exists {
        return Err(format!("{} {} not found on the platform", id.resource_type, identifier));
    }

    state.record(&imported, PROVIDER_NAME);
    state.increment_serial();
    backend
        .write_state(&state)
        .await
        .map_err(|e| format!("Failed to save state: {}", e))?;

    println!("{} Imported {} ({})", "✓".green(), id, identifier);
    Ok(())
}

async fn run_state_list(file: &Path) -> Result<(), String> {
    let config = config::load(file)?;
    let backend = create_backend(&config.backend).map_err(|e| e.to_string())?;
    let state = backend
        .read_state()
        .await
        .map_err(|e| e.to_string())?
        .unwrap_or_default();

    if state.resources.is_empty() {
        println!("{}", "No resources recorded.".dimmed());
        return Ok(());
    }
    for resource in &state.resources {
        println!(
            "{}  {}",
            resource.resource_id().to_string().bold(),
            resource.identifier.as_deref().unwrap_or("-").dimmed()
        );
    }
    Ok(())
}

async fn run_state_unlock(file: &Path, lock_id: &str) -> Result<(), String> {
    let config = config::load(file)?;
    let backend = create_backend(&config.backend).map_err(|e| e.to_string())?;
    backend
        .force_unlock(lock_id)
        .await
        .map_err(|e| e.to_string())?;
    println!("{} Lock {} released", "✓".green(), lock_id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use yugaform_core::provider::{BoxFuture, ProviderError, ProviderResult, ResourceType};
    use yugaform_core::resource::Value;
    use yugaform_core::schema::{AttributeSchema, AttributeType};
    use yugaform_state::BackendConfig;

    struct ReleaseType;

    impl ResourceType for ReleaseType {
        fn name(&self) -> &'static str {
            "release"
        }

        fn schema(&self) -> ResourceSchema {
            ResourceSchema::new("release")
                .attribute(AttributeSchema::new("version", AttributeType::String).required())
        }

        fn supports_update(&self) -> bool {
            false
        }
    }

    /// Platform double keyed by identifier
    #[derive(Clone, Default)]
    struct FakePlatform {
        objects: Arc<Mutex<HashMap<String, State>>>,
        fail_on: Option<String>,
    }

    impl Provider for FakePlatform {
        fn name(&self) -> &'static str {
            "fake"
        }

        fn resource_types(&self) -> Vec<Box<dyn ResourceType>> {
            vec![Box::new(ReleaseType)]
        }

        fn read(
            &self,
            id: &ResourceId,
            identifier: Option<&str>,
            _prior: Option<&State>,
        ) -> BoxFuture<'_, ProviderResult<State>> {
            let id = id.clone();
            let found = identifier.and_then(|i| self.objects.lock().unwrap().get(i).cloned());
            Box::pin(async move { Ok(found.unwrap_or_else(|| State::not_found(id))) })
        }

        fn create(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
            let resource = resource.clone();
            Box::pin(async move {
                let Some(Value::String(version)) = resource.attributes.get("version") else {
                    return Err(ProviderError::new("version missing"));
                };
                if self.fail_on.as_deref() == Some(version.as_str()) {
                    return Err(ProviderError::new("Create release failed (500): boom")
                        .for_resource(resource.id.clone()));
                }
                let state = State::existing(resource.id.clone(), resource.attributes.clone())
                    .with_identifier(version.clone());
                self.objects
                    .lock()
                    .unwrap()
                    .insert(version.clone(), state.clone());
                Ok(state)
            })
        }

        fn update(
            &self,
            id: &ResourceId,
            _identifier: &str,
            _from: &State,
            _to: &Resource,
        ) -> BoxFuture<'_, ProviderResult<State>> {
            let id = id.clone();
            Box::pin(async move { Err(ProviderError::new("not supported").for_resource(id)) })
        }

        fn delete(
            &self,
            _id: &ResourceId,
            identifier: &str,
            _from: &State,
        ) -> BoxFuture<'_, ProviderResult<()>> {
            self.objects.lock().unwrap().remove(identifier);
            Box::pin(async { Ok(()) })
        }
    }

    fn release(name: &str, version: &str) -> Resource {
        Resource::new("release", name).with_attribute("version", Value::String(version.into()))
    }

    fn backend(dir: &tempfile::TempDir) -> Box<dyn StateBackend> {
        let path = dir.path().join("state.json");
        create_backend(&BackendConfig::local(path.to_string_lossy())).unwrap()
    }

    #[tokio::test]
    async fn test_apply_records_each_effect() {
        let dir = tempfile::tempdir().unwrap();
        let backend = backend(&dir);
        let platform = FakePlatform::default();
        let resources = vec![release("lts", "2.20.1.3-b3"), release("preview", "2.21.0.0-b1")];

        let plan = build_plan(&platform, &resources, &[]).unwrap();
        assert_eq!(plan.effects().len(), 2);

        let mut state = StateFile::new();
        let mut interpreter = Interpreter::new(platform.clone());
        execute_plan(&mut interpreter, &plan, &mut state, backend.as_ref())
            .await
            .unwrap();

        let saved = backend.read_state().await.unwrap().unwrap();
        assert_eq!(saved.serial, 2);
        assert_eq!(saved.resources.len(), 2);
        assert_eq!(
            saved
                .find_resource(&ResourceId::new("release", "lts"))
                .and_then(|r| r.identifier.as_deref()),
            Some("2.20.1.3-b3")
        );

        // Second run against refreshed state has nothing to do
        let current = refresh(&platform, &saved).await.unwrap();
        let plan = build_plan(&platform, &resources, &current).unwrap();
        assert!(plan.is_empty());
    }

    #[tokio::test]
    async fn test_apply_stops_at_first_failure_and_keeps_progress() {
        let dir = tempfile::tempdir().unwrap();
        let backend = backend(&dir);
        let platform = FakePlatform {
            fail_on: Some("2.21.0.0-b1".to_string()),
            ..Default::default()
        };
        let resources = vec![
            release("lts", "2.20.1.3-b3"),
            release("preview", "2.21.0.0-b1"),
            release("old", "2.18.9.0-b2"),
        ];

        let plan = build_plan(&platform, &resources, &[]).unwrap();
        let mut state = StateFile::new();
        let mut interpreter = Interpreter::new(platform.clone());
        let err = execute_plan(&mut interpreter, &plan, &mut state, backend.as_ref())
            .await
            .unwrap_err();
        assert_eq!(err, "Apply failed: 1 succeeded, 1 not attempted");

        let saved = backend.read_state().await.unwrap().unwrap();
        assert_eq!(saved.resources.len(), 1);
        assert_eq!(saved.resources[0].name, "lts");
    }

    #[tokio::test]
    async fn test_refresh_drops_vanished_resources() {
        let platform = FakePlatform::default();
        let mut state = StateFile::new();
        state.record(
            &State::existing(ResourceId::new("release", "gone"), HashMap::new())
                .with_identifier("2.14.0.0-b1"),
            PROVIDER_NAME,
        );

        let current = refresh(&platform, &state).await.unwrap();
        assert!(current.is_empty());

        let plan = build_plan(&platform, &[release("gone", "2.14.0.0-b1")], &current).unwrap();
        assert!(matches!(plan.effects()[0], Effect::Create(_)));
    }

    #[tokio::test]
    async fn test_undeclared_resources_are_deleted() {
        let dir = tempfile::tempdir().unwrap();
        let backend = backend(&dir);
        let platform = FakePlatform::default();
        let mut state = StateFile::new();

        let plan = build_plan(&platform, &[release("lts", "2.20.1.3-b3")], &[]).unwrap();
        let mut interpreter = Interpreter::new(platform.clone());
        execute_plan(&mut interpreter, &plan, &mut state, backend.as_ref())
            .await
            .unwrap();

        let current = refresh(&platform, &state).await.unwrap();
        let plan = build_plan(&platform, &[], &current).unwrap();
        assert!(matches!(plan.effects()[0], Effect::Delete { .. }));
        execute_plan(&mut interpreter, &plan, &mut state, backend.as_ref())
            .await
            .unwrap();

        assert!(state.resources.is_empty());
        assert!(platform.objects.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_import_refuses_managed_resources() {
        let dir = tempfile::tempdir().unwrap();
        let backend = backend(&dir);
        let platform = FakePlatform::default();
        let id = ResourceId::new("release", "lts");

        let err = import_locked(&platform, backend.as_ref(), &id, "2.20.1.3-b3")
            .await
            .unwrap_err();
        assert_eq!(err, "release 2.20.1.3-b3 not found on the platform");

        platform.create(&release("lts", "2.20.1.3-b3")).await.unwrap();
        import_locked(&platform, backend.as_ref(), &id, "2.20.1.3-b3")
            .await
            .unwrap();
        let err = import_locked(&platform, backend.as_ref(), &id, "2.20.1.3-b3")
            .await
            .unwrap_err();
        assert_eq!(err, "release.lts is already managed");
    }
}
