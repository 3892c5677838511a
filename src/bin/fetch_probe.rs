use clap::Parser;
use networth_tracker::config::GisEndpoint;
use networth_tracker::market::GisClient;

/// 手動戳一個縣府 GIS 端點，確認欄位名稱跟回應格式。
/// 改 config.yaml 之前先用這個驗證。
#[derive(Parser)]
#[command(name = "fetch_probe")]
#[command(about = "Probe a county GIS parcel endpoint by address or point")]
struct Args {
    /// ArcGIS REST layer query URL (…/MapServer/0/query)
    #[arg(long)]
    url: String,

    /// Attribute field holding the situs address
    #[arg(long, default_value = "SITUS_ADDRESS")]
    address_field: String,

    /// Attribute field holding the market value
    #[arg(long, default_value = "TOTAL_VALUE")]
    value_field: String,

    /// Situs address to look up
    #[arg(long)]
    address: Option<String>,

    /// Longitude,latitude point to look up (e.g. -96.78,33.32)
    #[arg(long)]
    point: Option<String>,

    #[arg(long, default_value = "30")]
    timeout_seconds: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    println!("🚀 GIS 端點探測");
    println!("📡 Endpoint: {}", args.url);

    let endpoint = GisEndpoint {
        url: args.url.clone(),
        address_field: args.address_field.clone(),
        value_field: args.value_field.clone(),
    };
    let client = GisClient::new(args.timeout_seconds, 1, 0);

    if let Some(address) = &args.address {
        println!("🔍 Query by address: {}", address);
        let value = client.market_value_by_address(&endpoint, address).await?;
        println!("✅ {} = ${:.0}", args.value_field, value);
        return Ok(());
    }

    if let Some(point) = &args.point {
        let parts: Vec<&str> = point.split(',').collect();
        if parts.len() != 2 {
            anyhow::bail!("--point expects 'lon,lat', got '{}'", point);
        }
        let lon: f64 = parts[0].trim().parse()?;
        let lat: f64 = parts[1].trim().parse()?;

        println!("🔍 Query by point: ({}, {})", lon, lat);
        let value = client.market_value_by_point(&endpoint, lon, lat).await?;
        println!("✅ {} = ${:.0}", args.value_field, value);
        return Ok(());
    }

    anyhow::bail!("Provide --address or --point")
}
