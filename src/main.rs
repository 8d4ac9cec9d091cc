use anyhow::Context;
use clap::Parser;
use serde_json::{json, Value};
use teleapo_crm::config::cli::{Command, SettingsAction};
use teleapo_crm::domain::ports::SettingsCache;
use teleapo_crm::utils::error::ErrorSeverity;
use teleapo_crm::utils::{logger, validation::Validate};
use teleapo_crm::{
    read_import_csv, CliConfig, CrmClient, CrmError, CustomerField, CustomerPatch, FileCache,
    NewCallRecord, NewCustomer, PostgrestBackend,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    if cli.json_logs {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(cli.verbose);
    }
    tracing::debug!("CLI config: {:?}", cli);

    if let Err(e) = cli.validate() {
        tracing::error!("❌ Invalid arguments: {}", e);
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(2);
    }

    match run(&cli).await {
        Ok(output) => {
            let rendered =
                serde_json::to_string_pretty(&output).context("failed to render command output")?;
            println!("{}", rendered);
        }
        Err(e) => {
            tracing::error!(
                "❌ Command failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());

            let exit_code = match e.severity() {
                ErrorSeverity::Low => 0,
                ErrorSeverity::Medium => 2,
                ErrorSeverity::High => 1,
                ErrorSeverity::Critical => 3,
            };
            if exit_code > 0 {
                std::process::exit(exit_code);
            }
        }
    }

    Ok(())
}

async fn run(cli: &CliConfig) -> teleapo_crm::Result<Value> {
    if !cli.needs_backend() {
        return show_cached(cli);
    }

    let config = cli.client_config()?;
    let client: CrmClient<PostgrestBackend> = CrmClient::connect(&config)?;

    let output = match &cli.command {
        Command::Ping => {
            client.ping().await?;
            json!({ "status": "ok", "success": true })
        }
        Command::List { business, archived } => {
            let customers = if *archived {
                client.list_archived_customers(business.as_deref()).await?
            } else {
                client.list_customers(business.as_deref()).await?
            };
            json!({ "customers": customers })
        }
        Command::Show { id } => serde_json::to_value(client.get_customer(id).await?)?,
        Command::Add(args) => {
            let customer = client
                .add_customer(NewCustomer {
                    business_id: args.business.clone(),
                    company_name: args.company.clone(),
                    contact_name: args.contact.clone(),
                    department: args.department.clone(),
                    phone: args.phone.clone(),
                    email: args.email.clone(),
                    address: args.address.clone(),
                    tags: args.tags.clone(),
                    notes: args.notes.clone(),
                })
                .await?;
            json!({ "success": true, "customer": customer })
        }
        Command::Update { id, set, clear } => {
            let mut patch = CustomerPatch::new();
            for (name, value) in set {
                patch = patch.set(field_named(name)?, value.clone())?;
            }
            for name in clear {
                patch = patch.clear(field_named(name)?)?;
            }
            client.update_customer(id, &patch).await?;
            json!({ "success": true })
        }
        Command::Delete { id } => {
            client.delete_customer(id).await?;
            json!({ "success": true })
        }
        Command::Archive { id } => {
            client.archive_customer(id).await?;
            json!({ "success": true })
        }
        Command::Restore { id } => {
            client.restore_customer(id).await?;
            json!({ "success": true })
        }
        Command::Call(args) => {
            let logged = client
                .add_call_record(NewCallRecord {
                    customer_id: args.customer_id.clone(),
                    call_date: args.date.clone(),
                    result: args.result.clone(),
                    duration: args.duration.clone(),
                    operator: args.operator.clone(),
                    memo: args.memo.clone(),
                    tags: args.tags.clone(),
                })
                .await?;
            json!({ "success": true, "call": logged })
        }
        Command::Import { file } => {
            let customers = read_import_csv(file)?;
            let summary = client.bulk_import(customers).await?;
            json!({ "success": true, "imported": summary.imported, "skipped": summary.skipped })
        }
        Command::Dupes(args) => {
            if args.all_businesses || args.exclude.is_some() {
                let matches = client
                    .find_cross_business_duplicates(&args.company, &args.phone, args.exclude.as_deref())
                    .await?;
                json!({ "duplicates": matches })
            } else {
                serde_json::to_value(
                    client
                        .check_duplicates(&args.business, &args.company, &args.phone)
                        .await?,
                )?
            }
        }
        Command::Settings { action } => {
            let sync = client.settings_sync(FileCache::new(config.cache_path()));
            match action {
                SettingsAction::Pull => serde_json::to_value(sync.pull().await?)?,
                SettingsAction::Push { key, value } => {
                    let value: Value = serde_json::from_str(value)?;
                    serde_json::to_value(sync.push(key, &value).await?)?
                }
                SettingsAction::Show { key } => json!({ "key": key, "value": sync.cached(key)? }),
                SettingsAction::Remote => json!({ "settings": client.get_settings().await? }),
            }
        }
        Command::Reconcile => {
            let sync = client.settings_sync(FileCache::new(config.cache_path()));
            serde_json::to_value(sync.reconcile().await?)?
        }
    };

    Ok(output)
}

/// Reads a cached setting without touching the backend.
fn show_cached(cli: &CliConfig) -> teleapo_crm::Result<Value> {
    let Command::Settings {
        action: SettingsAction::Show { key },
    } = &cli.command
    else {
        return Err(CrmError::validation("only cached reads run without a backend"));
    };
    let cache = FileCache::new(cli.cache_path()?);
    Ok(json!({ "key": key, "value": cache.get(key)? }))
}

fn field_named(name: &str) -> teleapo_crm::Result<CustomerField> {
    CustomerField::from_external(name)
        .ok_or_else(|| CrmError::validation(format!("Unknown customer field '{}'", name)))
}
