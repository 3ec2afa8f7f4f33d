use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use transactor::schema::{FieldConfig, FieldManager, FieldStorage};
use transactor::storage::RecordStorage;
use transactor::transactor::BindingChoice;
use transactor::{
    Actor, ConfigurationSubmission, ExecutionEngine, FieldValue, MemoryBackend, Record, RecordId,
    TransactionType, TransactionTypeManager, TransactorConfig, TransactorRegistry,
};

#[derive(Parser)]
#[command(name = "transactor-tool")]
#[command(about = "Developer tooling for transaction types and transactors")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List registered transactors and the fields they declare
    Plugins,
    /// Run the transactions of a JSON fixture against in-memory storage
    Simulate {
        #[arg(long)]
        fixture: PathBuf,
        /// Language code passed to descriptions
        #[arg(long)]
        langcode: Option<String>,
    },
}

#[derive(Deserialize)]
struct Fixture {
    #[serde(default)]
    config: TransactorConfig,
    /// Bundles per entity type
    #[serde(default)]
    bundles: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    fields: Vec<FixtureField>,
    #[serde(default)]
    records: Vec<Record>,
    #[serde(default)]
    transaction_types: Vec<FixtureType>,
    #[serde(default)]
    transactions: Vec<FixtureTransaction>,
}

#[derive(Deserialize)]
struct FixtureField {
    storage: FieldStorage,
    label: String,
    #[serde(default)]
    bundles: Vec<String>,
}

#[derive(Deserialize)]
struct FixtureType {
    id: String,
    label: String,
    target_entity_type: String,
    #[serde(default)]
    bundles: Vec<String>,
    transactor: String,
    #[serde(default)]
    configuration: ConfigurationSubmission,
}

#[derive(Deserialize)]
struct FixtureTransaction {
    #[serde(rename = "type")]
    type_id: String,
    target: RecordId,
    #[serde(default)]
    fields: BTreeMap<String, FieldValue>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Plugins => list_plugins(),
        Command::Simulate { fixture, langcode } => simulate(&fixture, langcode.as_deref()).await,
    }
}

fn list_plugins() -> Result<()> {
    let backend = MemoryBackend::new();
    let registry = TransactorRegistry::with_default_transactors(
        backend.services(Actor::anonymous(), TransactorConfig::default()),
    );

    for definition in registry.definitions() {
        println!("{} ({})", definition.id, definition.title);
        if !definition.description.is_empty() {
            println!("  {}", definition.description);
        }
        for (group, fields) in [
            ("transaction", &definition.transaction_fields),
            ("target", &definition.target_entity_fields),
        ] {
            for field in fields {
                println!(
                    "  {:<12} {:<20} {:<18} {}",
                    group,
                    field.name,
                    field.field_type,
                    if field.required { "required" } else { "optional" }
                );
            }
        }
    }
    Ok(())
}

async fn simulate(path: &Path, langcode: Option<&str>) -> Result<()> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read fixture {}", path.display()))?;
    let fixture: Fixture = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse fixture {}", path.display()))?;

    let backend = MemoryBackend::new();
    for (entity_type, bundles) in &fixture.bundles {
        for bundle in bundles {
            backend.bundles.add_bundle(entity_type, bundle).await;
        }
    }

    for field in fixture.fields {
        let storage = field.storage;
        backend
            .fields
            .create_field_storage(storage.clone())
            .await
            .with_context(|| format!("failed to create field {}", storage.id()))?;
        for bundle in field.bundles {
            backend
                .fields
                .create_field(FieldConfig::new(
                    storage.entity_type.clone(),
                    bundle,
                    storage.field_name.clone(),
                    field.label.clone(),
                ))
                .await?;
        }
    }

    for record in &fixture.records {
        backend.records.save(record).await?;
    }

    // Fixtures are trusted: configure as an administrator.
    let services = backend.services(Actor::admin("fixture"), fixture.config);
    let registry = Arc::new(TransactorRegistry::with_default_transactors(services));
    let types = TransactionTypeManager::new(backend.types.clone(), registry.clone());
    let engine = ExecutionEngine::new(
        backend.types.clone(),
        backend.transactions.clone(),
        registry,
    );

    for declared in fixture.transaction_types {
        let mut transaction_type =
            TransactionType::new(&declared.id, &declared.label, &declared.target_entity_type);
        transaction_type.set_bundles(declared.bundles);
        types
            .set_transactor(&mut transaction_type, &declared.transactor)
            .await
            .with_context(|| format!("failed to bind transactor of type {}", declared.id))?;

        let schema = types.configuration_schema(&transaction_type).await?;
        types
            .apply_configuration(&mut transaction_type, &schema, &declared.configuration)
            .await
            .with_context(|| format!("failed to configure type {}", declared.id))?;

        println!("type {} -> {}", transaction_type.id(), declared.transactor);
        for (key, value) in transaction_type.plugin_settings() {
            println!("  {} = {}", key, value);
        }
        for element in schema.groups().iter().flat_map(|g| g.bindings()) {
            if let Some(BindingChoice::Create { machine_name, .. }) =
                declared.configuration.binding(element.name())
            {
                println!("  created field for {}: {}", element.name(), machine_name);
            }
        }
    }

    for (index, entry) in fixture.transactions.into_iter().enumerate() {
        let mut transaction = engine
            .create(&entry.type_id, entry.target)
            .await
            .with_context(|| format!("transaction #{} of type {}", index + 1, entry.type_id))?;
        for (name, value) in entry.fields {
            transaction.set_field(name, value);
        }

        let indications = engine.execution_indications(&transaction, langcode).await?;
        let outcome = engine.execute(&mut transaction).await?;
        let description = engine.describe(&transaction, langcode).await?;

        println!("{}: {:?}", description, outcome);
        println!("  {}", indications);
        for line in engine.details(&transaction, langcode).await? {
            println!("  {}", line);
        }
    }

    for record in &fixture.records {
        let stored = backend
            .records
            .load(&record.entity_type, record.id)
            .await?
            .ok_or_else(|| anyhow!("record {} disappeared", record.reference()))?;
        println!("{}", serde_json::to_string(&stored)?);
    }

    Ok(())
}
