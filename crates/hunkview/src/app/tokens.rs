//! Background tokenization: jobs run on the tokio runtime and report back
//! over a channel drained once per frame

use super::App;
use hunkview_core::TokenJob;

impl App {
    /// Start whole-diff highlighting for both sides
    pub fn start_highlighting(&mut self) {
        let jobs = self.renderer.request_highlighting();
        self.spawn_jobs(jobs);
        // Cache hits were applied synchronously
        self.rebuild();
    }

    pub(super) fn spawn_jobs(&mut self, jobs: impl IntoIterator<Item = TokenJob>) {
        for job in jobs {
            log::trace!("spawning {job:?}");
            let tx = self.token_tx.clone();
            self.pending_jobs += 1;
            tokio::spawn(async move {
                // Receiver is gone when the app has quit
                let _ = tx.send(job.run().await);
            });
        }
    }

    /// Commit every finished batch; returns true when rows changed
    pub fn poll_token_batches(&mut self) -> bool {
        let mut changed = false;
        while let Ok(batch) = self.token_rx.try_recv() {
            self.pending_jobs = self.pending_jobs.saturating_sub(1);
            let target = batch.target();
            if self.renderer.commit(batch) {
                changed = true;
            } else {
                log::debug!("token batch for {target:?} not applied");
            }
        }
        if changed {
            self.rebuild();
        }
        changed
    }

    pub fn pending_jobs(&self) -> usize {
        self.pending_jobs
    }
}
