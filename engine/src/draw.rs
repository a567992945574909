//! Draw lifecycle: start, stop, reveal, close.

use std::time::Instant;

use chrono::Utc;

use gala_types::{DrawStatus, ParticipantId, PrizeId, WinnerCommit};

use crate::pool::resolve_pool;
use crate::schedule::{RevealTimer, RollingTicker};
use crate::selection::select;
use crate::state::{DrawEvent, DrawSession, RollingDraw, ShowingDraw, StoppingDraw, Transition};
use crate::{DrawEngine, DrawError};

impl DrawEngine {
    /// Begin rolling for `prize_id`. Ignored unless idle.
    ///
    /// Nothing is written; the winners are chosen at [`stop`](Self::stop).
    pub fn start(&mut self, prize_id: &PrizeId, count: usize) -> Result<Transition, DrawError> {
        if !matches!(self.session, DrawSession::Idle) {
            tracing::debug!(status = %self.status(), "start ignored");
            return Ok(Transition::Ignored);
        }
        if count == 0 {
            return Err(DrawError::InvalidCount);
        }
        let prize = self
            .ledger
            .get(prize_id)
            .ok_or_else(|| DrawError::UnknownPrize(prize_id.clone()))?;
        let pool = resolve_pool(&self.roster, prize);
        let available = pool.len();
        if available < count {
            return Err(DrawError::InsufficientPool {
                available,
                requested: count,
            });
        }

        let ticker = RollingTicker::spawn(
            pool.ids(),
            self.settings.roll_interval,
            self.settings.rolling_preview,
        );
        tracing::info!(prize = %prize_id, count, pool = available, "Draw started");

        self.requested_count = count;
        self.last_failure = None;
        self.rolling_frame.clear();
        self.session = DrawSession::Rolling(RollingDraw {
            prize: prize_id.clone(),
            count,
            ticker,
        });
        Ok(Transition::Applied)
    }

    /// Fix the winners and schedule the reveal. Ignored unless rolling.
    pub fn stop(&mut self) -> Transition {
        let (prize, count) = match &self.session {
            DrawSession::Rolling(draw) => (draw.prize.clone(), draw.count),
            _ => {
                tracing::debug!(status = %self.status(), "stop ignored");
                return Transition::Ignored;
            }
        };
        // Leaving Rolling drops the ticker.
        self.session = DrawSession::Idle;
        self.rolling_frame.clear();

        let winners = match self.draw_winners(&prize, count) {
            Ok(winners) => winners,
            Err(err) => {
                tracing::warn!(prize = %prize, error = %err, "Draw could not pick winners");
                self.fail(err);
                return Transition::Applied;
            }
        };
        tracing::info!(prize = %prize, winners = winners.len(), "Draw stopped");

        if self.settings.reveal_delay.is_zero() {
            self.commit_and_show(prize, winners);
        } else {
            self.session = DrawSession::Stopping(StoppingDraw {
                prize,
                winners,
                reveal: RevealTimer::schedule(self.settings.reveal_delay),
            });
        }
        Transition::Applied
    }

    /// Return to idle after showing. Idempotent from idle; ignored while
    /// rolling or stopping.
    pub fn close(&mut self) -> Transition {
        match self.status() {
            DrawStatus::Showing => {
                self.session = DrawSession::Idle;
                self.rolling_frame.clear();
                tracing::info!("Draw closed");
                Transition::Applied
            }
            DrawStatus::Idle => Transition::Ignored,
            status => {
                tracing::debug!(%status, "close ignored");
                Transition::Ignored
            }
        }
    }

    /// Tear down any session immediately. A pending reveal is discarded and
    /// nothing is recorded for it.
    pub fn abort(&mut self) -> Transition {
        let status = self.status();
        if matches!(self.session, DrawSession::Idle) {
            return Transition::Ignored;
        }
        self.session = DrawSession::Idle;
        self.rolling_frame.clear();
        tracing::info!(%status, "Draw aborted");
        Transition::Applied
    }

    /// Advance timers. Call regularly from the host loop.
    ///
    /// Pulls the latest rolling frame and, once the reveal is due, commits the
    /// winners. Returns the next pending event, if any.
    pub fn tick(&mut self) -> Option<DrawEvent> {
        let now = Instant::now();
        let due = match &mut self.session {
            DrawSession::Rolling(draw) => {
                if let Some(frame) = draw.ticker.as_mut().and_then(RollingTicker::latest_frame) {
                    self.rolling_frame = frame;
                }
                false
            }
            DrawSession::Stopping(draw) => draw.reveal.is_due(now),
            DrawSession::Idle | DrawSession::Showing(_) => false,
        };
        if due {
            self.reveal();
        }
        self.events.pop_front()
    }

    /// Wait for a pending reveal and commit it. Returns immediately with the
    /// next queued event when nothing is pending.
    pub async fn wait_for_reveal(&mut self) -> Option<DrawEvent> {
        if let DrawSession::Stopping(draw) = &mut self.session {
            draw.reveal.wait().await;
            self.reveal();
        }
        self.events.pop_front()
    }

    fn draw_winners(&mut self, prize_id: &PrizeId, count: usize) -> Result<Vec<ParticipantId>, DrawError> {
        let prize = self
            .ledger
            .get(prize_id)
            .ok_or_else(|| DrawError::UnknownPrize(prize_id.clone()))?;
        let pool = resolve_pool(&self.roster, prize).ids();
        // Read at stop time: a late activation still applies to this draw.
        let overrides = self.overrides.snapshot_for(prize_id);
        Ok(select(&pool, &overrides, count, &mut self.rng)?)
    }

    fn reveal(&mut self) {
        let DrawSession::Stopping(draw) = std::mem::take(&mut self.session) else {
            return;
        };
        let StoppingDraw { prize, winners, .. } = draw;
        self.commit_and_show(prize, winners);
    }

    fn commit_and_show(&mut self, prize: PrizeId, winners: Vec<ParticipantId>) {
        match self.commit(&prize, &winners) {
            Ok(()) => {
                tracing::info!(prize = %prize, winners = winners.len(), "Winners committed");
                self.events.push_back(DrawEvent::Revealed {
                    prize: prize.clone(),
                    winners: winners.clone(),
                });
                self.session = DrawSession::Showing(ShowingDraw { prize, winners });
            }
            Err(err) => {
                tracing::warn!(prize = %prize, error = %err, "Commit failed; nothing recorded");
                self.fail(err);
            }
        }
    }

    /// Durable first, then mirrors. A failure leaves both untouched.
    fn commit(&mut self, prize_id: &PrizeId, winners: &[ParticipantId]) -> Result<(), DrawError> {
        let prize = self
            .ledger
            .get(prize_id)
            .ok_or_else(|| DrawError::commit(prize_id, "prize no longer exists"))?;
        prize
            .check_winners(winners)
            .map_err(|e| DrawError::rejected_commit(&e))?;
        if let Some(unknown) = self.roster.first_unknown(winners) {
            return Err(DrawError::commit(
                prize_id,
                format!("unknown participant {unknown}"),
            ));
        }

        let commit = WinnerCommit {
            prize_id: prize_id.clone(),
            winners: winners.to_vec(),
            won_at: Utc::now(),
        };
        self.backend
            .commit_winners(&commit)
            .map_err(|e| DrawError::commit(prize_id, format!("{e:#}")))?;

        self.apply_durable_commit(&commit);
        Ok(())
    }

    /// Mirror a commit the store already holds. Never fails: the winners are
    /// recorded whatever happens to the mirrors.
    pub(crate) fn apply_durable_commit(&mut self, commit: &WinnerCommit) {
        match self.ledger.apply_commit(commit) {
            Ok(()) => self.roster.apply_commit(commit),
            Err(err) => {
                tracing::warn!(error = %err, "Ledger mirror rejected a stored commit; reloading");
                if let Err(err) = self.reload() {
                    tracing::error!(error = %err, "Mirror reload failed after a durable commit");
                }
            }
        }
    }

    fn fail(&mut self, err: DrawError) {
        self.session = DrawSession::Idle;
        self.rolling_frame.clear();
        self.last_failure = Some(err.clone());
        self.events.push_back(DrawEvent::CommitFailed(err));
    }
}
