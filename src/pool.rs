//! Parallel crawling of many sites under one wall-clock deadline.
//!
//! Sites are deduplicated, shuffled and dealt round-robin into lanes, one per
//! unit of host parallelism. Each lane is a spawned task that crawls its sites
//! one after another and reports over a channel:
//!
//! - [`LaneEvent::Recorded`] for every article, the moment it is recorded
//! - [`LaneEvent::Finished`] once the lane ran out of sites or time
//!
//! The coordinator listens until every lane finished or the deadline passed,
//! then grants a bounded grace period for stragglers. Lanes still running
//! after that are aborted. Their articles were already reported one by one,
//! so a hung or panicking lane loses only the page it was working on.

use crate::crawler::SiteCrawler;
use crate::crawler::visited::VisitedLinks;
use crate::fetcher::Transport;
use crate::models::{Article, CrawlBudget, ResultSet};
use futures::future::join_all;
use itertools::Itertools;
use rand::rng;
use rand::seq::SliceRandom;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tokio::time::timeout;
use tracing::{debug, error, info, instrument, warn};

/// Default grace period granted to lanes after the deadline.
pub const DEFAULT_COLLECTION_GRACE: Duration = Duration::from_secs(10);

/// Message from a lane to the coordinator.
#[derive(Debug)]
pub enum LaneEvent {
    /// One article, sent as soon as the lane records it.
    Recorded { lane: usize, article: Article },
    /// Everything the lane found; replaces the articles collected so far.
    Finished { lane: usize, result: ResultSet },
}

/// Number of lanes to use when none is configured.
pub fn default_lanes() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Deal `sites` round-robin into at most `lanes` non-empty lanes.
pub fn partition(sites: Vec<String>, lanes: usize) -> Vec<Vec<String>> {
    let lanes = lanes.max(1).min(sites.len().max(1));
    let mut out = vec![Vec::new(); lanes];
    for (i, site) in sites.into_iter().enumerate() {
        out[i % lanes].push(site);
    }
    out.retain(|lane| !lane.is_empty());
    out
}

#[derive(Debug)]
struct LaneStatus {
    results: ResultSet,
    finished: bool,
}

/// Fans a site list out over concurrent lanes.
#[derive(Debug)]
pub struct WorkPool<T> {
    crawler: Arc<SiteCrawler<T>>,
    lanes: usize,
    grace: Duration,
}

impl<T: Transport + 'static> WorkPool<T> {
    pub fn new(crawler: Arc<SiteCrawler<T>>, lanes: usize, grace: Duration) -> Self {
        Self {
            crawler,
            lanes: lanes.max(1),
            grace,
        }
    }

    /// Crawl every site before `budget.deadline`, returning whatever the
    /// lanes found.
    ///
    /// # Arguments
    ///
    /// * `sites` - Seed URLs; duplicates are crawled once
    /// * `budget` - Shared deadline and depth bound for every lane
    /// * `visited` - Shared link set; links claimed by any lane land here
    ///
    /// # Returns
    ///
    /// The union of all lanes' articles. Lanes that were aborted after the
    /// grace period, or that panicked, contribute every article they
    /// recorded before stopping. Returns without waiting when the deadline
    /// has already passed.
    #[instrument(level = "info", skip_all, fields(sites = sites.len(), lanes = self.lanes))]
    pub async fn run(
        &self,
        sites: &[String],
        budget: CrawlBudget,
        visited: &VisitedLinks,
    ) -> ResultSet {
        let mut sites: Vec<String> = sites.iter().unique().cloned().collect();
        sites.shuffle(&mut rng());
        let assignments = partition(sites, self.lanes);
        info!(lanes = assignments.len(), "Starting lanes");

        let (tx, mut rx) = unbounded_channel();
        let handles: Vec<_> = assignments
            .into_iter()
            .enumerate()
            .map(|(lane, lane_sites)| {
                tokio::spawn(run_lane(
                    lane,
                    lane_sites,
                    Arc::clone(&self.crawler),
                    budget,
                    visited.clone(),
                    tx.clone(),
                ))
            })
            .collect();
        drop(tx);

        let mut status: Vec<LaneStatus> = (0..handles.len())
            .map(|_| LaneStatus {
                results: self.crawler.empty_results(),
                finished: false,
            })
            .collect();

        if timeout(budget.remaining(), collect(&mut rx, &mut status))
            .await
            .is_err()
        {
            info!("Deadline reached before all lanes finished");
        }
        if timeout(self.grace, collect(&mut rx, &mut status))
            .await
            .is_err()
        {
            warn!(grace = ?self.grace, "Collection grace period expired");
        }

        for (lane, handle) in handles.iter().enumerate() {
            if !status[lane].finished {
                warn!(lane, "Lane did not finish; keeping the articles it reported");
                handle.abort();
            }
        }
        // Aborted lanes stop at their next await; wait so none outlives the pool.
        for (lane, joined) in join_all(handles).await.into_iter().enumerate() {
            match joined {
                Err(e) if e.is_panic() => error!(lane, error = %e, "Lane panicked"),
                _ => {}
            }
        }

        let mut merged = self.crawler.empty_results();
        for lane in status {
            merged.merge(lane.results);
        }
        info!(
            articles = merged.total_articles(),
            visited = visited.current_len(),
            "Work pool finished"
        );
        merged
    }
}

/// Drain lane events until every lane finished or all senders are gone.
async fn collect(rx: &mut UnboundedReceiver<LaneEvent>, status: &mut [LaneStatus]) {
    while !status.iter().all(|s| s.finished) {
        let Some(event) = rx.recv().await else {
            return;
        };
        match event {
            LaneEvent::Recorded { lane, article } => {
                debug!(lane, link = %article.link, "Lane recorded article");
                let term = article.term.clone();
                status[lane].results.push(&term, article);
            }
            LaneEvent::Finished { lane, result } => {
                debug!(lane, articles = result.total_articles(), "Lane finished");
                status[lane].results = result;
                status[lane].finished = true;
            }
        }
    }
}

#[instrument(level = "info", skip_all, fields(lane = lane, sites = sites.len()))]
async fn run_lane<T: Transport>(
    lane: usize,
    sites: Vec<String>,
    crawler: Arc<SiteCrawler<T>>,
    budget: CrawlBudget,
    visited: VisitedLinks,
    tx: UnboundedSender<LaneEvent>,
) {
    let mut results = crawler.empty_results();
    for site in &sites {
        if budget.expired() {
            info!("Deadline reached; lane stopping");
            break;
        }
        let found = crawler
            .crawl_site(site, &budget, &visited, |article| {
                // The coordinator may already be gone; nothing to do then.
                let _ = tx.send(LaneEvent::Recorded {
                    lane,
                    article: article.clone(),
                });
            })
            .await;
        results.merge(found);
    }
    let _ = tx.send(LaneEvent::Finished {
        lane,
        result: results,
    });
}
