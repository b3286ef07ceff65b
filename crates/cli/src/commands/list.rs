use anyhow::Result;

pub fn run() -> Result<()> {
    let detectors = riskguard_detectors::all_detectors();

    println!("{:<22} {:<18} Description", "Name", "Check Type");
    println!("{}", "-".repeat(90));

    for d in &detectors {
        println!(
            "{:<22} {:<18} {}",
            d.name(),
            d.check_type().as_str(),
            d.description()
        );
    }

    println!("\nTotal: {} detectors", detectors.len());
    Ok(())
}
