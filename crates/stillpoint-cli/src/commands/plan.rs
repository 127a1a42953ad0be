use stillpoint_core::Config;

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let plan = config.session_plan()?;
    println!("{}", serde_json::to_string_pretty(&plan)?);
    Ok(())
}
