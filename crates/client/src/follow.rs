//! `finishcam follow`: keep one session's clock and live buffer current.

use std::future::{self, Future};
use std::pin::Pin;

use anyhow::{Context, Result};
use chrono::{FixedOffset, Utc};
use finishcam_core::live::{BlobStore, LiveEvent, LiveStream};
use finishcam_core::time::{Timestamp, format_time};
use finishcam_core::{FetchFailure, FetchTicket, PollScheduler, SchedulerEvent, SessionLocation, TimeBase};

use crate::config::ClientConfig;
use crate::fetch::Fetcher;
use crate::push::{PushEvent, PushLink};

type PendingFetch = Pin<Box<dyn Future<Output = (FetchTicket, Result<Vec<u8>, FetchFailure>)>>>;

pub async fn follow(config: &ClientConfig, location: SessionLocation) -> Result<()> {
    let offset = config.offset();
    let fetcher = Fetcher::new(config.request_timeout()).context("building HTTP client")?;
    let mut scheduler = PollScheduler::new(config.poll, offset);
    let mut live = LiveStream::new(BlobStore::default(), config.live.clone(), offset);
    let mut push = if config.push {
        let link = PushLink::new(location.push_endpoint()?, config.live.reconnect.clone());
        log::info!("streaming live frames from {}", link.endpoint());
        Some(link)
    } else {
        None
    };
    let mut in_flight: Option<PendingFetch> = None;

    scheduler.start(location, now(offset));
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        if in_flight.is_none()
            && let Some(ticket) = scheduler.begin_fetch(now(offset))
        {
            let fetcher = fetcher.clone();
            in_flight = Some(Box::pin(async move {
                let outcome = fetcher.get(ticket.url.clone()).await;
                (ticket, outcome)
            }));
        }
        if in_flight.is_none() && scheduler.next_poll_at().is_none() {
            log::info!("session is not live anymore, stopping");
            break;
        }

        tokio::select! {
            (ticket, outcome) = fetch_outcome(&mut in_flight) => {
                in_flight = None;
                let outcome = outcome.as_deref().map_err(FetchFailure::clone);
                let events = scheduler.complete_fetch(&ticket, outcome, now(offset));
                report(&scheduler, &events);
            }
            () = sleep_until(scheduler.next_poll_at(), offset), if in_flight.is_none() => {}
            event = push_event(&mut push) => match event {
                PushEvent::Frame(data) => match live.handle_frame(&data) {
                    Some(LiveEvent::ImageStored { index }) => {
                        let bytes = data.len().saturating_sub(1);
                        log::info!("live image for frame {index} ({bytes} bytes)");
                    }
                    Some(LiveEvent::Announced { index }) => log::debug!("frame {index} announced"),
                    None => {}
                },
                PushEvent::Connected => {}
                PushEvent::Disconnected(_) => live.disconnect(),
                PushEvent::GaveUp => {
                    live.disconnect();
                    push = None;
                }
            },
            result = &mut shutdown => {
                result.context("waiting for ctrl-c")?;
                log::info!("interrupted");
                break;
            }
        }
    }

    if let Some(link) = push.as_mut() {
        link.close().await;
    }
    live.disconnect();
    Ok(())
}

fn now(offset: FixedOffset) -> Timestamp {
    Utc::now().with_timezone(&offset)
}

fn report(scheduler: &PollScheduler, events: &[SchedulerEvent]) {
    for event in events {
        match event {
            SchedulerEvent::NewImage { last_index: Some(index) } => {
                let end = scheduler.time_end().map(|t| format_time(&t, false));
                log::info!(
                    "frame {index} complete, session covered until {}",
                    end.as_deref().unwrap_or("?")
                );
            }
            SchedulerEvent::NewImage { last_index: None } => {
                log::info!("session metadata loaded, no frame complete yet");
            }
            SchedulerEvent::Error(message) => log::error!("{message}"),
            SchedulerEvent::Recovered => log::info!("metadata polling recovered"),
        }
    }
}

async fn fetch_outcome(
    slot: &mut Option<PendingFetch>,
) -> (FetchTicket, Result<Vec<u8>, FetchFailure>) {
    match slot {
        Some(fetch) => fetch.await,
        None => future::pending().await,
    }
}

async fn sleep_until(at: Option<Timestamp>, offset: FixedOffset) {
    match at {
        Some(at) => {
            let delay = (at - now(offset)).to_std().unwrap_or_default();
            tokio::time::sleep(delay).await;
        }
        None => future::pending().await,
    }
}

async fn push_event(link: &mut Option<PushLink>) -> PushEvent {
    match link {
        Some(link) => link.next_event().await,
        None => future::pending().await,
    }
}
