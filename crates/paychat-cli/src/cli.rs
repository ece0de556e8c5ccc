use clap::Parser;

use paychat_agent::ChatExtras;

/// paychat: a line-oriented client for the payments agent.
#[derive(Parser, Debug)]
#[command(name = "paychat", version, about)]
pub struct Args {
    /// Config file path override.
    #[arg(long)]
    pub config: Option<String>,

    /// Log filter directive (e.g. `debug`, `paychat_agent=trace`).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Customer the conversation is about.
    #[arg(long)]
    pub customer_id: Option<u64>,

    /// Start of the date range, passed through to the agent.
    #[arg(long, requires = "to")]
    pub from: Option<String>,

    /// End of the date range.
    #[arg(long, requires = "from")]
    pub to: Option<String>,

    /// Currency code for amounts (e.g. USD).
    #[arg(long)]
    pub currency: Option<String>,
}

impl Args {
    /// Structured context attached to every turn, if any was given.
    pub fn extras(&self) -> Option<ChatExtras> {
        if self.customer_id.is_none() && self.from.is_none() && self.currency.is_none() {
            return None;
        }
        let mut extras = ChatExtras::default();
        if let Some(id) = self.customer_id {
            extras = extras.with_customer_id(id);
        }
        if let (Some(from), Some(to)) = (&self.from, &self.to) {
            extras = extras.with_range(from, to);
        }
        if let Some(currency) = &self.currency {
            extras = extras.with_currency(currency);
        }
        Some(extras)
    }
}

pub fn parse() -> Args {
    Args::parse()
}
