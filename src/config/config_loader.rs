use anyhow::{Context, Result};

use super::{
    config_model::{CronJob, Database, DotEnvyConfig, Server},
    stage::Stage,
};

pub fn load() -> Result<DotEnvyConfig> {
    dotenvy::dotenv().ok();

    let server = Server {
        port: required_var("SERVER_PORT")?
            .parse()
            .context("SERVER_PORT is invalid")?,
        body_limit: required_var("SERVER_BODY_LIMIT")?
            .parse()
            .context("SERVER_BODY_LIMIT is invalid")?,
        timeout: required_var("SERVER_TIMEOUT")?
            .parse()
            .context("SERVER_TIMEOUT is invalid")?,
    };

    let database = Database {
        url: required_var("DATABASE_URL")?,
    };

    let cron_job = CronJob {
        secret: std::env::var("CRON_SECRET").ok().and_then(|v| {
            let trimmed = v.trim().to_string();
            (!trimmed.is_empty()).then_some(trimmed)
        }),
    };

    Ok(DotEnvyConfig {
        server,
        database,
        cron_job,
        stage: get_stage(),
    })
}

pub fn get_stage() -> Stage {
    dotenvy::dotenv().ok();

    let stage_str = std::env::var("STAGE").unwrap_or("".to_string());
    Stage::try_from(&stage_str).unwrap_or_default()
}

fn required_var(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("{key} is invalid"))
}
