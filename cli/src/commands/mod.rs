use std::path::PathBuf;

use bulkid::{
    config::YAML_CONFIG_NAME, read_config, read_plan, BulkIdConfig, BulkIdStrategy,
    BulkOperationPlan, SessionToken,
};

use crate::{cli_interface::PlanArgs, console::print_error_message};

pub mod explain;
pub mod run;

/// Everything a plan command needs, loaded from its arguments.
pub struct LoadedPlan {
    pub config: BulkIdConfig,
    pub plan: BulkOperationPlan,
    pub strategy: BulkIdStrategy,
    pub session: SessionToken,
}

pub fn load_plan(args: &PlanArgs) -> Result<LoadedPlan, Box<dyn std::error::Error>> {
    let config_path = PathBuf::from(args.config.as_deref().unwrap_or(YAML_CONFIG_NAME));
    let config = read_config(&config_path).map_err(|e| {
        print_error_message(&format!(
            "Could not read the config at {}: trace: {}",
            config_path.display(),
            e
        ));
        e
    })?;

    let plan = read_plan(&PathBuf::from(&args.plan)).map_err(|e| {
        print_error_message(&format!("Could not read the plan at {}: trace: {}", args.plan, e));
        e
    })?;

    let strategy = BulkIdStrategy::from_config(&config).map_err(|e| {
        print_error_message(&format!("Could not pick a bulk id strategy: trace: {}", e));
        e
    })?;

    let session = match &args.session {
        Some(token) => SessionToken::new(token.clone()).map_err(|e| {
            print_error_message(&e.to_string());
            e
        })?,
        None => SessionToken::generate(),
    };

    Ok(LoadedPlan { config, plan, strategy, session })
}
