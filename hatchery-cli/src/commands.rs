//! Hatchery subcommands
//!
//! Every command prints JSON to stdout so the output can be piped into other
//! tools.

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Args, Subcommand};
use hatchery_client::{HealthStatus, Tank, TankLocation, TankType};
use hatchery_core::{BabyForm, BreedingForm, Hatchery, PollerConfig, TimeWindow};
use serde_json::{json, Value};
use tracing::info;

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List tanks, or the occupancy of one pool
    Tanks(TankArgs),

    /// Manage breeding cycles
    #[command(subcommand)]
    Breeding(BreedingCommands),

    /// Manage baby batches
    #[command(subcommand)]
    Baby(BabyCommands),

    /// Print dashboard figures
    Dashboard {
        /// Time window (today, week, month, all)
        #[arg(short, long, default_value = "all")]
        window: TimeWindow,
    },

    /// Poll the backend and print a dashboard after every refresh
    Watch {
        /// Time window (today, week, month, all)
        #[arg(short, long, default_value = "today")]
        window: TimeWindow,
    },
}

#[derive(Debug, Args)]
pub struct TankArgs {
    /// Show available and in-use tanks of one pool (breeding, baby)
    #[arg(short, long)]
    pub category: Option<String>,

    #[command(subcommand)]
    pub action: Option<TankCommands>,
}

#[derive(Debug, Subcommand)]
pub enum TankCommands {
    /// Add a tank to the pool
    Add {
        /// Tank code, e.g. B3
        #[arg(long)]
        code: String,
        /// Location (breeding, baby, normal, special-care)
        #[arg(short, long)]
        location: String,
        /// Tank type (mud-puddle, glass, cement, special)
        #[arg(short = 't', long = "type", default_value = "glass")]
        tank_type: String,
        #[arg(short, long)]
        description: Option<String>,
    },

    /// Move a tank to another location
    Relocate {
        /// Tank id
        id: String,
        /// New location
        #[arg(short, long)]
        location: String,
    },
}

#[derive(Debug, Subcommand)]
pub enum BreedingCommands {
    /// List breeding cycles
    List,

    /// Start a breeding cycle in a free breeding tank
    Create {
        #[arg(short, long)]
        fish_type: String,
        #[arg(short, long)]
        mothers: i64,
        #[arg(short = 'F', long)]
        fathers: i64,
        /// Tank id
        #[arg(short, long)]
        tank: String,
        /// Breeding date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(short, long)]
        description: Option<String>,
    },

    /// Edit a breeding cycle
    Update {
        id: String,
        #[arg(short, long)]
        fish_type: Option<String>,
        #[arg(short, long)]
        mothers: Option<i64>,
        #[arg(short = 'F', long)]
        fathers: Option<i64>,
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(short, long)]
        description: Option<String>,
    },

    /// Delete a breeding cycle and all of its batches
    Delete { id: String },
}

#[derive(Debug, Subcommand)]
pub enum BabyCommands {
    /// List batches with age and live count
    List,

    /// Record a batch born from a breeding cycle
    Create {
        /// Breeding record id
        #[arg(short, long)]
        breeding: String,
        /// Baby tank id
        #[arg(short, long)]
        tank: String,
        /// Number of babies
        #[arg(short, long)]
        count: i64,
        /// Birth date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Health (healthy, concern, sick, critical)
        #[arg(long, value_parser = parse_health)]
        health: Option<HealthStatus>,
        #[arg(short, long)]
        description: Option<String>,
    },

    /// Edit a batch in place
    Update {
        id: String,
        #[arg(short, long)]
        count: Option<i64>,
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long, value_parser = parse_health)]
        health: Option<HealthStatus>,
        #[arg(short, long)]
        description: Option<String>,
    },

    /// Delete one batch
    Delete { id: String },

    /// Add deaths to a batch
    Mortality {
        id: String,
        /// Number of new deaths
        deaths: i64,
    },

    /// Replace a batch's mortality total
    SetMortality { id: String, count: i64 },

    /// Move a batch to another free baby tank
    Transfer {
        id: String,
        /// Target tank id
        tank: String,
    },
}

fn parse_health(raw: &str) -> Result<HealthStatus, String> {
    HealthStatus::try_parse(raw).ok_or_else(|| {
        format!("unknown health status '{}' (expected healthy, concern, sick or critical)", raw)
    })
}

/// Run one command and return what to print.
pub async fn execute(hatchery: &Hatchery, poller: PollerConfig, command: Command) -> anyhow::Result<Value> {
    let today = hatchery.clock().today();

    match command {
        Command::Tanks(args) => match args.action {
            Some(action) => execute_tank(hatchery, action).await,
            None => match args.category.as_deref().map(TankLocation::parse) {
                Some(TankLocation::Breeding) => {
                    Ok(json!(hatchery.breeding().list_available_tanks().await?))
                }
                Some(TankLocation::Baby) => Ok(json!(hatchery.babies().list_available_tanks().await?)),
                Some(other) => anyhow::bail!("no allocation pool for category '{}'", other),
                None => Ok(json!(hatchery.backend().list_tanks().await?)),
            },
        },

        Command::Breeding(cmd) => match cmd {
            BreedingCommands::List => Ok(json!(hatchery.breeding().list().await?)),

            BreedingCommands::Create {
                fish_type,
                mothers,
                fathers,
                tank,
                date,
                description,
            } => {
                let form = BreedingForm {
                    fish_type: Some(fish_type),
                    mother_count: Some(mothers),
                    father_count: Some(fathers),
                    breeding_date: Some(date.unwrap_or(today)),
                    tank_id: Some(tank),
                    description,
                };
                Ok(json!(hatchery.breeding().create(&form).await?))
            }

            BreedingCommands::Update {
                id,
                fish_type,
                mothers,
                fathers,
                date,
                description,
            } => {
                let stored = hatchery.breeding().get(&id).await?;
                let mut form = BreedingForm::from_record(&stored);
                form.fish_type = fish_type.or(form.fish_type);
                form.mother_count = mothers.or(form.mother_count);
                form.father_count = fathers.or(form.father_count);
                form.breeding_date = date.or(form.breeding_date);
                form.description = description.or(form.description);
                Ok(json!(hatchery.breeding().update(&id, &form).await?))
            }

            BreedingCommands::Delete { id } => Ok(json!(hatchery.breeding().delete(&id).await?)),
        },

        Command::Baby(cmd) => match cmd {
            BabyCommands::List => Ok(json!(hatchery.babies().list().await?)),

            BabyCommands::Create {
                breeding,
                tank,
                count,
                date,
                health,
                description,
            } => {
                let form = BabyForm {
                    breeding_id: Some(breeding),
                    baby_tank_id: Some(tank),
                    original_count: Some(count),
                    mortality_count: None,
                    birth_date: Some(date.unwrap_or(today)),
                    health_status: health,
                    description,
                };
                Ok(json!(hatchery.babies().create(&form).await?))
            }

            BabyCommands::Update {
                id,
                count,
                date,
                health,
                description,
            } => {
                let stored = hatchery.babies().get(&id).await?;
                let mut form = BabyForm::from_record(&stored);
                form.original_count = count.or(form.original_count);
                form.birth_date = date.or(form.birth_date);
                form.health_status = health.or(form.health_status);
                form.description = description.or(form.description);
                Ok(json!(hatchery.babies().update(&id, &form).await?))
            }

            BabyCommands::Delete { id } => {
                let deleted = hatchery.babies().delete(&id).await?;
                Ok(json!({ "id": id, "deleted": deleted }))
            }

            BabyCommands::Mortality { id, deaths } => {
                Ok(json!(hatchery.babies().record_mortality(&id, deaths).await?))
            }

            BabyCommands::SetMortality { id, count } => {
                Ok(json!(hatchery.babies().set_mortality(&id, count).await?))
            }

            BabyCommands::Transfer { id, tank } => {
                Ok(json!(hatchery.babies().transfer_tank(&id, &tank).await?))
            }
        },

        Command::Dashboard { window } => Ok(json!(hatchery.dashboard(window).await?)),

        Command::Watch { window } => {
            watch(hatchery, poller, window).await?;
            Ok(Value::Null)
        }
    }
}

async fn execute_tank(hatchery: &Hatchery, action: TankCommands) -> anyhow::Result<Value> {
    match action {
        TankCommands::Add {
            code,
            location,
            tank_type,
            description,
        } => {
            let location = known_location(&location)?;
            let mut tank = Tank::new(String::new(), code, location);
            tank.tank_type = TankType::parse(&tank_type);
            tank.description = description.unwrap_or_default();
            Ok(json!(hatchery.backend().create_tank(&tank).await?))
        }

        TankCommands::Relocate { id, location } => {
            let location = known_location(&location)?;
            let mut tank = hatchery
                .backend()
                .list_tanks()
                .await?
                .into_iter()
                .find(|t| t.id == id)
                .with_context(|| format!("tank not found: {}", id))?;
            tank.location = location;
            Ok(json!(hatchery.backend().update_tank(&id, &tank).await?))
        }
    }
}

fn known_location(raw: &str) -> anyhow::Result<TankLocation> {
    match TankLocation::parse(raw) {
        TankLocation::Unknown => anyhow::bail!("unknown tank location '{}'", raw),
        location => Ok(location),
    }
}

/// Print a summary for every new snapshot until Ctrl-C.
async fn watch(hatchery: &Hatchery, config: PollerConfig, window: TimeWindow) -> anyhow::Result<()> {
    let handle = hatchery.poll(config);
    let mut rx = handle.subscribe();

    info!(window = %window, "Watching farm, Ctrl-C to stop");

    loop {
        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = rx.borrow_and_update().clone();
                if let Some(snapshot) = snapshot {
                    let summary = hatchery_core::DashboardAggregator::summarize(
                        &snapshot,
                        window,
                        hatchery.clock().now(),
                    );
                    println!("{}", serde_json::to_string(&summary)?);
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Stopping watch");
                break;
            }
        }
    }

    handle.shutdown().await;
    Ok(())
}
