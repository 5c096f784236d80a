use std::thread;

use anyhow::{Context, Result};
use chrono::Local;
use watch_engine::{
    CycleOutcome, DeliveryAdapter, FeedSource, LogDelivery, Poller, PortalClient, TelegramDelivery,
};
use watch_logging::{watch_info, watch_warn};

use crate::cli::Command;
use crate::config::WatchConfig;

pub fn execute(command: Command, config: &WatchConfig) -> Result<()> {
    match command {
        Command::Check => {
            let (poller, delivery) = build(config)?;
            run_once(&poller, delivery.as_ref());
            Ok(())
        }
        Command::Watch => {
            let (poller, delivery) = build(config)?;
            watch_info!(
                "Polling every {}s, state in {:?}",
                config.poll_interval_secs,
                config.state_file
            );
            loop {
                run_once(&poller, delivery.as_ref());
                thread::sleep(config.poll_interval());
            }
        }
        Command::Stats => {
            let stats = config.state_store().stats();
            println!("State file:      {}", config.state_file.display());
            println!("Seen ids:        {}", stats.total_seen);
            println!("Window capacity: {}", stats.window_capacity);
            println!("Cycles checked:  {}", stats.total_checked);
            match stats.last_check {
                Some(at) => println!("Last check:      {}", at.with_timezone(&Local).to_rfc3339()),
                None => println!("Last check:      never"),
            }
            Ok(())
        }
        Command::Reset => {
            let removed = config
                .state_store()
                .reset()
                .context("failed to reset seen state")?;
            if removed {
                println!("Removed {}", config.state_file.display());
            } else {
                println!("Nothing to reset at {}", config.state_file.display());
            }
            Ok(())
        }
    }
}

fn build(config: &WatchConfig) -> Result<(Poller<PortalClient>, Box<dyn DeliveryAdapter>)> {
    config
        .require_credentials()
        .context("portal credentials are required for polling")?;

    let mut poller = Poller::new(PortalClient::new(config.portal_settings()), config.state_store());
    if !config.lock_state {
        poller = poller.without_lock();
    }

    let delivery: Box<dyn DeliveryAdapter> = match &config.telegram {
        Some(telegram) => Box::new(
            TelegramDelivery::new(&telegram.token, &telegram.chat_id, config.request_timeout())
                .context("failed to set up Telegram delivery")?,
        ),
        None => Box::new(LogDelivery),
    };
    Ok((poller, delivery))
}

/// One cycle plus delivery. Aborted cycles deliver nothing; delivery errors
/// are logged and do not touch the seen state.
pub fn run_once<S: FeedSource>(poller: &Poller<S>, delivery: &dyn DeliveryAdapter) -> CycleOutcome {
    let outcome = poller.check_for_update();
    if outcome.error().is_none() {
        if let Err(err) = delivery.deliver(outcome.batch()) {
            watch_warn!("Delivery failed: {}", err);
        }
    }
    outcome
}
