use std::error::Error;
use vpc_subnet_planner::config::{load_config, DEFAULT_CONFIG_FILE, DEFAULT_STATE_FILE};
use vpc_subnet_planner::output::{print_migration_hints, print_plan, print_plan_json};
use vpc_subnet_planner::plan_and_record;
use vpc_subnet_planner::provision::{apply_plan, DryRunProvisioner};
use vpc_subnet_planner::state::JsonLinesStore;

fn main() -> Result<(), Box<dyn Error>> {
    // Do as little as possible in main.rs as it can't contain any tests
    log4rs::init_file("log4rs.yml", Default::default()).expect("Error initializing log4rs");
    dotenv::dotenv().ok();
    log::info!("#Start main()");

    let config_file =
        std::env::var("VPC_PLAN_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
    let state_file =
        std::env::var("VPC_PLAN_STATE").unwrap_or_else(|_| DEFAULT_STATE_FILE.to_string());
    let output = std::env::var("VPC_PLAN_OUTPUT").unwrap_or_else(|_| "table".to_string());

    let config = load_config(&config_file)?;
    let mut store = JsonLinesStore::new(&state_file);
    let (mut plan, report) = plan_and_record(&config, &mut store)?;

    apply_plan(&mut plan, &mut DryRunProvisioner::default())?;

    match output.as_str() {
        "json" => print_plan_json(&plan)?,
        _ => print_plan(&plan)?,
    }
    print_migration_hints(&report);

    Ok(())
}
