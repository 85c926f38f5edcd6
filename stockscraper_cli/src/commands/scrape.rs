use anyhow::Result;
use clap::Args;
use stockscraper_lib::store::BlobStore;
use stockscraper_lib::{InvocationResponse, Orchestrator, ScrapeRequest};

#[derive(Args)]
pub struct ScrapeArgs {
    /// Quote identifiers as they appear in the quote URL (e.g. nike, microsoft-corp)
    #[arg(required = true)]
    pub symbols: Vec<String>,

    /// Keep records captured on or after this date (YYYY-MM-DD)
    #[arg(long)]
    pub start_date: Option<String>,

    /// Keep records captured on or before this date (YYYY-MM-DD)
    #[arg(long)]
    pub end_date: Option<String>,

    /// Published file format: json or csv
    #[arg(long, default_value = "json")]
    pub format: String,
}

impl ScrapeArgs {
    pub fn to_request(&self) -> ScrapeRequest {
        ScrapeRequest::new(self.symbols.iter().cloned())
            .with_dates(self.start_date.as_deref(), self.end_date.as_deref())
            .with_output_format(&self.format)
    }
}

pub async fn run<S: BlobStore>(
    args: &ScrapeArgs,
    orchestrator: &Orchestrator<S>,
) -> Result<InvocationResponse> {
    Ok(orchestrator.handle_request(args.to_request()).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_request_from_args() {
        let args = ScrapeArgs {
            symbols: vec!["nike".into(), "microsoft-corp".into()],
            start_date: Some("2023-01-01".into()),
            end_date: None,
            format: "csv".into(),
        };
        let req = args.to_request();
        assert_eq!(
            req.stock_symbols,
            Some(vec!["nike".to_string(), "microsoft-corp".to_string()])
        );
        assert_eq!(req.start_date.as_deref(), Some("2023-01-01"));
        assert!(req.end_date.is_none());
        assert_eq!(req.output_format.as_deref(), Some("csv"));
    }
}
