//! Offline end-to-end demo.
//!
//! Runs the real pipeline against canned upstream replies so the whole chain
//! (fence stripping, coercion, skip semantics, ranking) can be demonstrated
//! without API keys or network access.

use async_trait::async_trait;
use clap::Args;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use yieldscope::error::AppError;
use yieldscope::pipeline::domain::SearchProfile;
use yieldscope::pipeline::{round4, EvaluationPipeline, PipelineConfig, RentSource};
use yieldscope::providers::{ProviderError, TextGenerator};

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Area the canned search is framed around
    #[arg(long, default_value = "Brooklyn, NY")]
    pub(crate) area: String,
    /// Use the per-listing rent variant instead of the shared market scalar
    #[arg(long)]
    pub(crate) per_listing: bool,
}

struct CannedGenerator {
    replies: Mutex<VecDeque<String>>,
}

impl CannedGenerator {
    fn new(replies: Vec<String>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
        })
    }
}

#[async_trait]
impl TextGenerator for CannedGenerator {
    async fn complete(&self, _system: &str, _user: &str) -> Result<String, ProviderError> {
        self.replies
            .lock()
            .expect("demo mutex poisoned")
            .pop_front()
            .ok_or(ProviderError::Envelope {
                service: "demo",
                detail: "canned replies exhausted".to_string(),
            })
    }
}

fn canned_rent_reply() -> String {
    // fence-wrapped on purpose so the demo exercises the stripper
    "```json\n{\"average_rent\": 2600, \"min_rent\": 2200, \"max_rent\": 3100, \
     \"currency\": \"USD\", \"market_analysis\": \"Steady rental demand with low vacancy.\"}\n```"
        .to_string()
}

fn canned_harvest_reply(area: &str) -> String {
    format!(
        "- 123 Main St, {area}: asking $450,000, 2 bd, 850 sqft (https://zillow.com/main-st)\n\
         - 45 Ocean Ave, {area}: asking $390,000, 2 bd (https://redfin.com/ocean-ave)\n\
         - 9 Grand Pl, {area}: price on request, 2 bd"
    )
}

fn canned_normalizer_reply(area: &str, per_listing: bool) -> String {
    let rent_1 = if per_listing {
        ", \"estimated_rent_usd\": 2500"
    } else {
        ""
    };
    let rent_2 = if per_listing {
        ", \"estimated_rent_usd\": \"$2,700\""
    } else {
        ""
    };
    format!(
        "{{\"properties\": [\
         {{\"id\": \"prop-1\", \"address\": \"123 Main St, {area}\", \"price_usd\": \"$450,000\", \
          \"bedrooms\": 2, \"sqft\": 850, \"url\": \"https://zillow.com/main-st\"{rent_1}}},\
         {{\"id\": \"prop-2\", \"address\": \"45 Ocean Ave, {area}\", \"price_usd\": 390000, \
          \"bedrooms\": \"2 bd\", \"url\": \"https://redfin.com/ocean-ave\"{rent_2}}},\
         {{\"address\": \"9 Grand Pl, {area}\", \"price_usd\": \"on request\"}}\
         ]}}"
    )
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let profile = SearchProfile {
        min_price: 300_000.0,
        max_price: 550_000.0,
        area: args.area.clone(),
        bedrooms: 2,
        min_sqft: 700.0,
        max_sqft: 1100.0,
    };

    let rent_source = if args.per_listing {
        RentSource::PerListing
    } else {
        RentSource::MarketScalar
    };

    let searcher = CannedGenerator::new(vec![
        canned_rent_reply(),
        canned_harvest_reply(&args.area),
    ]);
    let structurer = CannedGenerator::new(vec![canned_normalizer_reply(
        &args.area,
        args.per_listing,
    )]);

    let pipeline = EvaluationPipeline::new(
        searcher,
        structurer,
        PipelineConfig {
            rent_source,
            max_listings: 10,
        },
    );

    let result = pipeline.evaluate(&profile).await?;

    println!("Area:                {}", profile.area);
    println!("Rent source:         {rent_source:?}");
    println!("Average rent (USD):  {}", result.average_rent);
    println!("Properties returned: {}", result.properties.len());
    println!();

    for (index, record) in result.properties.iter().enumerate() {
        println!("-- Property #{} --", index + 1);
        println!("ID:          {}", record.id);
        println!("Address:     {}", record.address);
        println!("Price (USD): {}", record.price);
        println!("Bedrooms:    {}", record.bedrooms);
        println!("Sqft:        {}", record.sqft);
        println!("Est. rent:   {}", record.estimated_rent);
        println!(
            "Gross yield: {} ({:.2}%)",
            round4(record.gross_yield),
            record.gross_yield * 100.0
        );
        if !record.url.is_empty() {
            println!("URL:         {}", record.url);
        }
        println!();
    }

    Ok(())
}
