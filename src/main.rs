// quotation-pdf: Generate a watermarked quotation PDF from booking form data

use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime};
use clap::Parser;
use quotation_pdf::pricing::format_amount;
use quotation_pdf::{
    DirectorySink, QuotationConfig, QuotationRequest, QuoteError, QuoteResult, RenderPipeline,
    WatermarkSource,
};
use tracing_subscriber::EnvFilter;

// ============================================================================
// Data Structures
// ============================================================================

/// CLI Arguments
#[derive(Parser, Debug)]
#[command(author, version, about = "Generate quotation PDFs for photography bookings")]
struct Args {
    /// Form data: client details and selected items (JSON)
    #[arg(short, long)]
    request: String,

    /// Business profile and layout settings (JSON, optional)
    #[arg(short, long)]
    config: Option<String>,

    /// Watermark image (file path or URL), overrides the config
    #[arg(short, long)]
    watermark: Option<String>,

    /// Skip the watermark even if one is configured
    #[arg(long)]
    no_watermark: bool,

    /// Directory the PDF is saved into
    #[arg(short, long, default_value = ".")]
    output_dir: String,

    /// Generation date (YYYY-MM-DD format, defaults to now)
    #[arg(short, long)]
    date: Option<String>,
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> QuoteResult<()> {
    let args = Args::parse();

    let generated_at = parse_date(&args.date)?;

    let config = match &args.config {
        Some(path) => QuotationConfig::from_json_file(path)?,
        None => QuotationConfig::default(),
    };

    let content = std::fs::read_to_string(&args.request)
        .map_err(|e| QuoteError::Config(format!("{}: {}", args.request, e)))?;
    let quotation = QuotationRequest::from_json_str(&content)?.into_quotation(generated_at)?;

    let mut pipeline = RenderPipeline::new(config);
    if args.no_watermark {
        pipeline = pipeline.with_watermark_source(None);
    } else if let Some(reference) = &args.watermark {
        pipeline = pipeline.with_watermark_source(Some(WatermarkSource::parse(reference)));
    }

    let client_name = quotation.client.name.clone();
    let item_count = quotation.items.len();
    let currency = pipeline.config().business.currency.clone();

    let runtime = tokio::runtime::Builder::new_current_thread().build()?;
    let mut sink = DirectorySink::new(&args.output_dir);
    let report = runtime.block_on(pipeline.run(quotation, &mut sink))?;

    println!("✓ Generated: {}", report.path.display());
    println!("  Client: {}", client_name);
    println!("  Items: {}", item_count);
    println!("  Total: {} {}", currency, format_amount(report.total_amount));
    println!(
        "  Watermark: {}",
        if report.watermark_applied { "applied" } else { "skipped" }
    );

    Ok(())
}

// ============================================================================
// Helper Functions
// ============================================================================

fn parse_date(date_str: &Option<String>) -> QuoteResult<NaiveDateTime> {
    match date_str {
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(|d| d.and_time(NaiveTime::MIN))
            .map_err(|_| QuoteError::Config(format!("Invalid date format: {}", s))),
        None => Ok(Local::now().naive_local()),
    }
}
