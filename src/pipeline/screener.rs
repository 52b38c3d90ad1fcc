// Batch screener: every post with media through the analyzer.
//
// A fixed number of posts are in flight at once (buffer_unordered). Each
// post's analysis is independent; results are merged only after the stream
// finishes, so completion order is whatever order workers finish in.

use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use super::analyzer::{AnalysisResult, InconclusivePost, PostAnalyzer, PostOutcome};
use crate::db::models::Post;
use crate::db::PostStore;
use crate::error::ScreenError;

/// Default number of posts analyzed in parallel.
pub const DEFAULT_CONCURRENCY: usize = 5;

/// Everything one run produced. Owned by the caller once returned.
#[derive(Debug, Default, Clone)]
pub struct ScreenReport {
    pub posts_screened: usize,
    pub flagged: Vec<AnalysisResult>,
    pub inconclusive: Vec<InconclusivePost>,
    pub clean: usize,
}

pub struct BatchScreener<'a> {
    analyzer: &'a PostAnalyzer,
    concurrency: usize,
    show_progress: bool,
}

impl<'a> BatchScreener<'a> {
    pub fn new(analyzer: &'a PostAnalyzer, concurrency: usize) -> Self {
        Self {
            analyzer,
            concurrency: concurrency.max(1),
            show_progress: false,
        }
    }

    /// Draw a terminal progress bar while screening.
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Load the corpus from the store and screen it.
    ///
    /// A store failure aborts before any analysis starts.
    pub async fn run(&self, store: &dyn PostStore) -> Result<ScreenReport, ScreenError> {
        let posts = store
            .posts_with_media()
            .await
            .map_err(|e| ScreenError::StoreUnavailable(format!("{e:#}")))?;

        info!(posts = posts.len(), concurrency = self.concurrency, "Screening corpus loaded");

        Ok(self.screen_all(posts).await)
    }

    /// Screen an in-memory batch of posts.
    ///
    /// Posts without media are skipped: the store query never returns them,
    /// and they couldn't pass the weapon half of the gate anyway.
    pub async fn screen_all(&self, posts: Vec<Post>) -> ScreenReport {
        let (posts, skipped): (Vec<Post>, Vec<Post>) = posts.into_iter().partition(Post::has_media);
        if !skipped.is_empty() {
            warn!(count = skipped.len(), "Skipping posts without media");
        }

        let pb = if self.show_progress {
            let pb = ProgressBar::new(posts.len() as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("  Screening [{bar:30}] {pos}/{len} ({eta})")
                    .expect("valid template"),
            );
            pb
        } else {
            ProgressBar::hidden()
        };

        let analyzer = self.analyzer;
        let outcomes: Vec<PostOutcome> = stream::iter(posts.iter().map(|post| {
            let pb = pb.clone();
            async move {
                let outcome = analyzer.analyze(post).await;
                pb.inc(1);
                outcome
            }
        }))
        .buffer_unordered(self.concurrency)
        .collect()
        .await;

        pb.finish_and_clear();

        let mut report = ScreenReport {
            posts_screened: posts.len(),
            ..Default::default()
        };
        for outcome in outcomes {
            match outcome {
                PostOutcome::Flagged(result) => report.flagged.push(result),
                PostOutcome::Inconclusive(post) => report.inconclusive.push(post),
                PostOutcome::Clean => report.clean += 1,
            }
        }

        info!(
            screened = report.posts_screened,
            flagged = report.flagged.len(),
            inconclusive = report.inconclusive.len(),
            clean = report.clean,
            "Screening complete"
        );

        report
    }
}
