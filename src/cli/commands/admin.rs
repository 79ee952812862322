use anyhow::Context;
use clap::Subcommand;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::password::hash_password;
use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::config::config;
use crate::database::models::organization::Organization;
use crate::database::models::user::{NewUser, Role, User};
use crate::database::models::validate_email_format;
use crate::database::{PgStore, Repository, Store};

#[derive(Subcommand)]
pub enum AdminCommands {
    #[command(about = "Create a super admin directly in the database (requires DATABASE_URL)")]
    Create {
        #[arg(long)]
        email: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        password: String,
        #[arg(long, help = "Organization id to attach the account to")]
        organization: Option<Uuid>,
    },

    #[command(about = "Print the bcrypt hash of a password")]
    HashPassword {
        #[arg(help = "Password to hash")]
        password: String,
    },
}

pub async fn handle(cmd: AdminCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let cost = config().security.bcrypt_cost;

    match cmd {
        AdminCommands::Create {
            email,
            name,
            password,
            organization,
        } => {
            let email = validate_email_format(&email).map_err(anyhow::Error::msg)?;
            let pg = PgStore::connect(&config().database)
                .await
                .context("failed to connect to Postgres (is DATABASE_URL set?)")?;
            pg.migrate().await?;
            let store: Arc<dyn Store> = Arc::new(pg);

            if let Some(org_id) = organization {
                Repository::<Organization>::new(store.clone())
                    .select_one(org_id)
                    .await?
                    .with_context(|| format!("organization {} does not exist", org_id))?;
            }

            let user = User::new(NewUser {
                name,
                email,
                password_hash: Some(hash_password(&password, cost).await?),
                role: Role::SuperAdmin,
                organization_id: organization,
                phone: None,
                address: None,
                email_verified: true,
            });
            Repository::<User>::new(store).create(&user).await?;

            output_success(
                output_format,
                &format!("Created super admin {}", user.email),
                Some(json!({ "id": user.id, "email": user.email })),
            )
        }
        AdminCommands::HashPassword { password } => {
            let hash = hash_password(&password, cost).await?;
            match output_format {
                OutputFormat::Json => output_success(output_format, "Password hashed", Some(json!({ "hash": hash }))),
                OutputFormat::Text => {
                    println!("{}", hash);
                    Ok(())
                }
            }
        }
    }
}
