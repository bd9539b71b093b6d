#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    lib_smartsense::init().await?;
    // A stdin read may still be parked on the blocking pool.
    std::process::exit(0);
}
