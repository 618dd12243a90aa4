//! OpenAPI provider CLI
//!
//! Command-line interface for inspecting and validating the provider a given
//! OpenAPI document would synthesize at runtime.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use openapi_provider_config::{discover_service, provider_name_from_binary, ProviderFactory};
use openapi_provider_spec::{load, SpecVersion};

#[derive(Parser)]
#[command(name = "terraform-provider-openapi")]
#[command(version, about = "Declarative resource provider synthesized from an OpenAPI document", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a document and display the provider it synthesizes
    #[command(after_help = "EXAMPLES:\n  \
        # Inspect a remote document\n  \
        terraform-provider-openapi inspect --swagger https://api.service.com/swagger.json\n\n  \
        # Inspect a local document under a custom provider name\n  \
        terraform-provider-openapi inspect --swagger ./swagger.yaml --provider-name goa")]
    Inspect {
        /// Document location: http(s) URL or local file path
        #[arg(short, long)]
        swagger: String,

        /// Provider namespace the resources are published under
        #[arg(long, default_value = "openapi")]
        provider_name: String,
    },

    /// Load a document and report whether a provider can be assembled from it
    Validate {
        /// Document location: http(s) URL or local file path
        #[arg(short, long)]
        swagger: String,
    },

    /// Show where the document for a provider name would be discovered from
    Discover {
        /// Provider name, or a full terraform-provider-<name> binary path
        #[arg(short, long)]
        name: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Inspect {
            swagger,
            provider_name,
        } => inspect_command(&swagger, &provider_name, cli.verbose)?,
        Commands::Validate { swagger } => validate_command(&swagger)?,
        Commands::Discover { name } => discover_command(&name)?,
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let filter = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn inspect_command(swagger: &str, provider_name: &str, verbose: bool) -> Result<()> {
    println!("{} Loading document: {}", "→".cyan(), swagger);
    let loaded = load(swagger).context("Failed to load the OpenAPI document")?;
    if loaded.version == SpecVersion::V3 {
        println!(
            "{} OpenAPI 3.0 document: only security and backend are analyzed",
            "!".yellow()
        );
    }

    let factory = ProviderFactory::assemble(provider_name, &loaded, false)
        .context("Failed to assemble a provider from the document")?;

    println!("\n{}", "✓ Provider assembled!".green().bold());
    println!("\n{}", "Backend:".bold());
    let backend = factory.backend();
    println!("  Host: {}", backend.host.yellow());
    println!("  Base path: {}", backend.base_path);
    println!("  Scheme: {}", backend.scheme);
    if backend.is_multi_region() {
        println!("  Regions: {}", backend.regions.join(", "));
    }

    println!("\n{}", "Provider configuration:".bold());
    for property in factory.provider_schema() {
        let required = if property.required {
            "required".red().to_string()
        } else {
            "optional".to_string()
        };
        println!("  • {} ({})", property.name.cyan(), required);
    }

    println!("\n{}", "Resources:".bold());
    for resource in factory.resources() {
        let mut verbs = vec!["C"];
        if resource.read.is_some() {
            verbs.push("R");
        }
        if resource.update.is_some() {
            verbs.push("U");
        }
        if resource.delete.is_some() {
            verbs.push("D");
        }
        println!(
            "  • {} ({}) {}",
            format!("{}_{}", provider_name, resource.name).cyan(),
            verbs.join(""),
            resource.path
        );
        if verbose {
            for property in resource.schema.properties() {
                println!("      {} [{:?}]", property.compliant_name(), property.property_type);
            }
        }
    }
    if factory.resources().is_empty() {
        println!("  (none)");
    }

    println!("\n{}", "Data sources:".bold());
    for data_source in factory.data_sources() {
        println!(
            "  • {} {}",
            format!("{}_{}", provider_name, data_source.name).cyan(),
            data_source.path
        );
    }
    if factory.data_sources().is_empty() {
        println!("  (none)");
    }

    Ok(())
}

fn validate_command(swagger: &str) -> Result<()> {
    println!("{} Validating document: {}", "→".cyan(), swagger);
    let loaded = load(swagger).context("Failed to load the OpenAPI document")?;
    let factory = ProviderFactory::assemble("openapi", &loaded, false)
        .context("The document does not assemble into a provider")?;
    println!(
        "{} {} resource(s), {} data source(s)",
        "✓".green().bold(),
        factory.resources().len(),
        factory.data_sources().len()
    );
    Ok(())
}

fn discover_command(name: &str) -> Result<()> {
    let provider_name = if name.contains("terraform-provider-") {
        provider_name_from_binary(name).context("Invalid provider binary name")?
    } else {
        name.to_string()
    };
    println!("{} Provider name: {}", "→".cyan(), provider_name.yellow());

    let settings = discover_service(&provider_name)
        .context("No document location configured for this provider")?;
    println!("  Document: {}", settings.swagger_url);
    println!("  Skip TLS verification: {}", settings.insecure_skip_verify);
    for entry in &settings.schema_configuration {
        println!("  Pre-configured property: {}", entry.schema_property_name);
    }
    Ok(())
}
