use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use server_api::credentials::hash_password;
use shared::domain::{NewCharge, NewCitizen};
use storage::{StoreAccessor, Storage};

/// Code, name, fine, jail months.
const DEFAULT_CHARGES: &[(&str, &str, i64, i64)] = &[
    ("KW-51", "Zakłócanie porządku publicznego", 500, 0),
    ("KW-92", "Niestosowanie się do znaków drogowych", 300, 0),
    ("KK-178a", "Prowadzenie pojazdu w stanie nietrzeźwości", 5000, 12),
    ("KK-190", "Groźby karalne", 2000, 6),
    ("KK-217", "Naruszenie nietykalności cielesnej", 1500, 3),
    ("KK-222", "Naruszenie nietykalności funkcjonariusza", 3000, 12),
    ("KK-278", "Kradzież", 2500, 9),
    ("KK-280", "Rozbój", 8000, 36),
    ("KK-288", "Zniszczenie mienia", 1500, 3),
];

#[derive(Parser, Debug)]
struct Cli {
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite://./data/police_tablet.db")]
    database_url: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    CreateOfficer {
        username: String,
        password: String,
        #[arg(long)]
        admin: bool,
    },
    CreateCitizen {
        first_name: String,
        last_name: String,
        #[arg(long)]
        pesel: Option<String>,
        #[arg(long)]
        birth_date: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        address: Option<String>,
    },
    CreateCharge {
        code: String,
        name: String,
        #[arg(long, default_value_t = 0)]
        fine: i64,
        #[arg(long, default_value_t = 0)]
        jail_months: i64,
        #[arg(long)]
        description: Option<String>,
    },
    SeedCharges,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let storage = Storage::new(&cli.database_url).await?;
    let mut store = storage.acquire().await?;

    match cli.command {
        Command::CreateOfficer {
            username,
            password,
            admin,
        } => {
            if username.trim().is_empty() || password.is_empty() {
                bail!("username and password must not be empty");
            }
            let hash = hash_password(&password)?;
            let user_id = store.create_officer(username.trim(), &hash, admin).await?;
            println!("created officer user_id={} admin={admin}", user_id.0);
        }
        Command::CreateCitizen {
            first_name,
            last_name,
            pesel,
            birth_date,
            phone,
            address,
        } => {
            let citizen_id = store
                .create_citizen(&NewCitizen {
                    first_name,
                    last_name,
                    birth_date,
                    pesel,
                    phone,
                    address,
                })
                .await?;
            println!("created citizen_id={}", citizen_id.0);
        }
        Command::CreateCharge {
            code,
            name,
            fine,
            jail_months,
            description,
        } => {
            if fine < 0 || jail_months < 0 {
                bail!("fine and jail months must not be negative");
            }
            let charge_id = store
                .create_charge(&NewCharge {
                    code,
                    name,
                    description,
                    fine,
                    jail_months,
                })
                .await?;
            println!("created charge_id={}", charge_id.0);
        }
        Command::SeedCharges => {
            for (code, name, fine, jail_months) in DEFAULT_CHARGES {
                store
                    .create_charge(&NewCharge {
                        code: (*code).to_string(),
                        name: (*name).to_string(),
                        description: None,
                        fine: *fine,
                        jail_months: *jail_months,
                    })
                    .await?;
            }
            println!("seeded {} charges", DEFAULT_CHARGES.len());
        }
    }

    Ok(())
}
