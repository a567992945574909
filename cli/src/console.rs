//! Executes console commands against the engine and renders replies.

use std::fmt::Write as _;

use gala_engine::{
    DrawEngine, DrawError, DrawEvent, DrawStatus, GalaConfig, LedgerSnapshot, ParticipantId,
    Prize, PrizeId, Transition,
};

use crate::commands::{Command, HELP, RigCommand};

/// Lines to print, and whether the session should end.
#[derive(Debug, Default)]
pub(crate) struct Reply {
    pub(crate) lines: Vec<String>,
    pub(crate) quit: bool,
}

impl Reply {
    fn line(text: impl Into<String>) -> Self {
        Self {
            lines: vec![text.into()],
            quit: false,
        }
    }

    fn error(err: &DrawError) -> Self {
        Self::line(format!("Error: {err}"))
    }
}

pub(crate) struct Console {
    engine: DrawEngine,
    batch_size: usize,
    persist_batch: bool,
}

impl Console {
    pub(crate) fn new(engine: DrawEngine) -> Self {
        let batch_size = engine.settings().batch_size;
        Self {
            engine,
            batch_size,
            persist_batch: true,
        }
    }

    pub(crate) fn engine_mut(&mut self) -> &mut DrawEngine {
        &mut self.engine
    }

    pub(crate) fn execute(&mut self, command: Command) -> Reply {
        match command {
            Command::Help => Reply::line(HELP),
            Command::Prizes => self.prizes(),
            Command::Next => {
                let _ = self.engine.select_next_prize();
                self.status()
            }
            Command::Prev => {
                let _ = self.engine.select_previous_prize();
                self.status()
            }
            Command::Select(n) => match self.prize_id(n) {
                Some(id) => match self.engine.select_prize(&id) {
                    Ok(Transition::Applied) => self.status(),
                    Ok(Transition::Ignored) => Reply::line("Finish the current draw first."),
                    Err(err) => Reply::error(&err),
                },
                None => Reply::line(format!("No prize number {n}.")),
            },
            Command::Start(count) => self.start(count),
            Command::Stop => match self.engine.stop() {
                Transition::Applied => Reply::line("Stopped. Revealing..."),
                Transition::Ignored => Reply::line("Nothing is rolling."),
            },
            Command::Close => match self.engine.close() {
                Transition::Applied => self.status(),
                Transition::Ignored => Reply::line("Nothing to close."),
            },
            Command::Toggle => {
                let before = self.engine.status();
                match self.engine.toggle(self.batch_size) {
                    Ok(Transition::Applied) => self.after_toggle(before),
                    Ok(Transition::Ignored) => Reply::line("Nothing to do right now."),
                    Err(err) => Reply::error(&err),
                }
            }
            Command::Status => self.status(),
            Command::Winners => self.winners(),
            Command::Batch(n) => self.set_batch(n),
            Command::AddPrize {
                name,
                quota,
                include_winners,
                temporary,
            } => match self
                .engine
                .add_prize(name, quota, include_winners, temporary)
            {
                Ok(id) => {
                    let number = self.engine.ledger().position(&id).map_or(0, |i| i + 1);
                    Reply::line(format!("Added prize #{number}."))
                }
                Err(err) => Reply::error(&err),
            },
            Command::Reset(n) => match self.prize_id(n) {
                Some(id) => match self.engine.reset_prize(&id) {
                    Ok(()) => Reply::line(format!("Prize #{n} reset.")),
                    Err(err) => Reply::error(&err),
                },
                None => Reply::line(format!("No prize number {n}.")),
            },
            Command::ResetAll => match self.engine.reset_all() {
                Ok(()) => Reply::line("All winners cleared."),
                Err(err) => Reply::error(&err),
            },
            Command::Import(path) => match LedgerSnapshot::read_from(&path) {
                Ok(snapshot) => match self.engine.import_snapshot(&snapshot) {
                    Ok(()) => Reply::line(format!(
                        "Imported {} participants and {} prizes.",
                        snapshot.participants.len(),
                        snapshot.prizes.len()
                    )),
                    Err(err) => Reply::error(&err),
                },
                Err(err) => Reply::line(format!("Error: {err:#}")),
            },
            Command::Export(path) => match self.engine.export_snapshot().write_to(&path) {
                Ok(()) => Reply::line(format!("Exported to {}.", path.display())),
                Err(err) => Reply::line(format!("Error: {err:#}")),
            },
            Command::Quit => {
                let _ = self.engine.abort();
                Reply {
                    lines: Vec::new(),
                    quit: true,
                }
            }
            Command::Rig(rig) => self.rig(rig),
        }
    }

    /// Render an event delivered by the engine's tick.
    pub(crate) fn describe_event(&self, event: &DrawEvent) -> Vec<String> {
        match event {
            DrawEvent::Revealed { prize, winners } => {
                let title = self.prize_label(prize);
                let mut lines = vec![format!("*** {title} ***")];
                for (i, id) in winners.iter().enumerate() {
                    lines.push(format!("  {}. {}", i + 1, self.person_label(id)));
                }
                lines.push("Type `close` (or `space`) to continue.".to_string());
                lines
            }
            DrawEvent::CommitFailed(err) => {
                vec![format!("Draw failed, nothing was recorded: {err}")]
            }
        }
    }

    /// One-line rolling display, or `None` when not rolling.
    pub(crate) fn rolling_line(&self) -> Option<String> {
        if self.engine.status() != DrawStatus::Rolling || self.engine.rolling_frame().is_empty() {
            return None;
        }
        let names: Vec<String> = self
            .engine
            .rolling_frame()
            .iter()
            .map(|id| self.person_name(id))
            .collect();
        Some(format!("  ~ {}", names.join("  ")))
    }

    fn start(&mut self, count: Option<usize>) -> Reply {
        let Some(prize) = self.engine.selected_prize() else {
            return Reply::error(&DrawError::NoPrizes);
        };
        let prize_id = prize.id.clone();
        let count = count.unwrap_or(self.batch_size);
        match self.engine.start(&prize_id, count) {
            Ok(Transition::Applied) => Reply::line(format!(
                "Rolling for {} ({count}). Type `stop` to draw.",
                self.prize_label(&prize_id)
            )),
            Ok(Transition::Ignored) => {
                Reply::line(format!("A draw is already {}.", self.engine.status()))
            }
            Err(err) => Reply::error(&err),
        }
    }

    fn after_toggle(&self, before: DrawStatus) -> Reply {
        match before {
            DrawStatus::Idle => Reply::line(format!(
                "Rolling ({}). Press `space` again to draw.",
                self.engine.requested_count()
            )),
            DrawStatus::Rolling => Reply::line("Stopped. Revealing..."),
            DrawStatus::Stopping | DrawStatus::Showing => self.status(),
        }
    }

    fn set_batch(&mut self, n: usize) -> Reply {
        let max = self.engine.settings().max_batch;
        if n > max {
            return Reply::line(format!("Batch size is limited to {max}."));
        }
        self.batch_size = n;
        if self.persist_batch
            && let Err(err) = GalaConfig::persist_batch_size(n)
        {
            tracing::warn!("Failed to persist batch size: {err}");
        }
        Reply::line(format!("Batch size set to {n}."))
    }

    fn status(&self) -> Reply {
        let mut lines = Vec::new();
        let status = self.engine.status();
        match self.engine.active_prize() {
            Some(prize) => lines.push(format!("State: {status} - {}", self.prize_label(prize))),
            None => lines.push(format!("State: {status}")),
        }
        if let Some(prize) = self.engine.selected_prize() {
            let pool = self.engine.pool_size(&prize.id).unwrap_or(0);
            let max = self.engine.max_draw_count(&prize.id).unwrap_or(0);
            lines.push(format!(
                "Selected: {} | {}/{} drawn | pool {pool} | up to {max} per draw | batch {}",
                self.prize_label(&prize.id),
                prize.winners().len(),
                prize.quota.get(),
                self.batch_size
            ));
        }
        if let Some(err) = self.engine.last_failure() {
            lines.push(format!("Last failure: {err}"));
        }
        Reply { lines, quit: false }
    }

    fn prizes(&self) -> Reply {
        let selected = self.engine.selected_prize().map(|p| p.id.clone());
        let mut lines = Vec::new();
        for (i, prize) in self.engine.ledger().iter().enumerate() {
            let marker = if Some(&prize.id) == selected.as_ref() { '>' } else { ' ' };
            let mut line = format!(
                "{marker} {:>2}. {} [{}/{}]",
                i + 1,
                prize.name,
                prize.winners().len(),
                prize.quota.get()
            );
            if prize.include_winners {
                line.push_str(" (open to winners)");
            }
            if prize.is_temporary {
                line.push_str(" (added live)");
            }
            if prize.is_complete() {
                line.push_str(" done");
            }
            lines.push(line);
        }
        if lines.is_empty() {
            lines.push("No prizes yet. Use `add-prize` or `import`.".to_string());
        }
        Reply { lines, quit: false }
    }

    fn winners(&self) -> Reply {
        let groups = self.engine.winners_by_prize();
        if groups.is_empty() {
            return Reply::line("No winners yet.");
        }
        let mut lines = Vec::new();
        for group in groups {
            lines.push(format!(
                "{} ({}/{})",
                group.prize.name,
                group.winners.len(),
                group.prize.quota.get()
            ));
            for person in group.winners {
                let mut line = format!("  - {}", person.name);
                if !person.department.is_empty() {
                    let _ = write!(line, " ({})", person.department);
                }
                lines.push(line);
            }
        }
        Reply { lines, quit: false }
    }

    fn rig(&mut self, command: RigCommand) -> Reply {
        let result = match command {
            RigCommand::Add { prize, participant } => match self.prize_id(prize) {
                Some(id) => self
                    .engine
                    .add_override(&id, &participant)
                    .map(|added| String::from(if added { "Saved." } else { "Already saved." })),
                None => Ok(format!("No prize number {prize}.")),
            },
            RigCommand::Remove { prize, participant } => match self.prize_id(prize) {
                Some(id) => self
                    .engine
                    .remove_override(&id, &participant)
                    .map(|removed| String::from(if removed { "Removed." } else { "Not found." })),
                None => Ok(format!("No prize number {prize}.")),
            },
            RigCommand::List => Ok(self.rig_listing()),
            RigCommand::Activate(on) => self
                .engine
                .set_overrides_activated(on)
                .map(|()| String::from(if on { "On." } else { "Off." })),
            RigCommand::Clear(None) => self.engine.clear_overrides().map(|()| "Cleared.".to_string()),
            RigCommand::Clear(Some(prize)) => match self.prize_id(prize) {
                Some(id) => self
                    .engine
                    .clear_overrides_for_prize(&id)
                    .map(|n| format!("Cleared {n}.")),
                None => Ok(format!("No prize number {prize}.")),
            },
        };
        match result {
            Ok(text) => Reply::line(text),
            Err(err) => Reply::error(&err),
        }
    }

    fn rig_listing(&self) -> String {
        let overrides = self.engine.overrides();
        let mut out = format!("[{}]", if overrides.is_activated() { "on" } else { "off" });
        for (i, prize) in self.engine.ledger().iter().enumerate() {
            let ids = overrides.list_for(&prize.id);
            if ids.is_empty() {
                continue;
            }
            let names: Vec<String> = ids.iter().map(|id| self.person_label(id)).collect();
            let _ = write!(out, "\n  {}. {}: {}", i + 1, prize.name, names.join(", "));
        }
        out
    }

    fn prize_id(&self, number: usize) -> Option<PrizeId> {
        number
            .checked_sub(1)
            .and_then(|index| self.engine.ledger().get_index(index))
            .map(|prize| prize.id.clone())
    }

    fn prize_label(&self, id: &PrizeId) -> String {
        self.engine
            .prize(id)
            .map_or_else(|| id.to_string(), |prize: &Prize| prize.name.to_string())
    }

    fn person_name(&self, id: &ParticipantId) -> String {
        self.engine
            .participant(id)
            .map_or_else(|| id.to_string(), |p| p.name.to_string())
    }

    fn person_label(&self, id: &ParticipantId) -> String {
        match self.engine.participant(id) {
            Some(p) if !p.department.is_empty() => format!("{} ({})", p.name, p.department),
            Some(p) => p.name.to_string(),
            None => id.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use gala_engine::{DrawSettings, NonEmptyString, Participant};

    use super::*;

    fn console() -> Console {
        let mut engine = DrawEngine::open_in_memory(DrawSettings::immediate().with_seed(1)).unwrap();
        let people = ["a", "b", "c", "d"]
            .iter()
            .map(|id| {
                Participant::new(
                    ParticipantId::new(*id),
                    NonEmptyString::new(format!("Person {id}")).unwrap(),
                    "Finance",
                )
            })
            .collect();
        engine.replace_roster(people).unwrap();
        let mut console = Console::new(engine);
        console.persist_batch = false;
        console
    }

    fn run(console: &mut Console, line: &str) -> Reply {
        let command = Command::parse(line).unwrap().unwrap();
        console.execute(command)
    }

    #[test]
    fn space_drives_a_full_draw() {
        let mut console = console();
        run(&mut console, "add-prize 2 Grand Prize");
        run(&mut console, "batch 2");

        run(&mut console, "space");
        assert_eq!(console.engine.status(), DrawStatus::Rolling);
        run(&mut console, "space");

        let event = console.engine_mut().tick().unwrap();
        let lines = console.describe_event(&event);
        assert_eq!(lines[0], "*** Grand Prize ***");
        assert_eq!(lines.len(), 4);

        run(&mut console, "space");
        assert_eq!(console.engine.status(), DrawStatus::Idle);
        let winners = run(&mut console, "winners");
        assert_eq!(winners.lines[0], "Grand Prize (2/2)");
    }

    #[test]
    fn batch_over_limit_refused() {
        let mut console = console();
        let reply = run(&mut console, "batch 11");
        assert_eq!(reply.lines, vec!["Batch size is limited to 10."]);
        assert_eq!(console.batch_size, 1);
    }

    #[test]
    fn rig_listing_is_hidden_from_help() {
        let mut console = console();
        run(&mut console, "add-prize 1 Gold");
        let reply = run(&mut console, "rig add 1 c");
        assert_eq!(reply.lines, vec!["Saved."]);
        let listing = run(&mut console, "rig list");
        assert!(listing.lines[0].contains("Person c"));
        assert!(!HELP.contains("rig"));
    }

    #[test]
    fn quit_aborts_pending_draw() {
        let mut console = console();
        run(&mut console, "add-prize 1 Gold");
        run(&mut console, "start");
        let reply = run(&mut console, "quit");
        assert!(reply.quit);
        assert_eq!(console.engine.status(), DrawStatus::Idle);
    }

    #[test]
    fn unknown_prize_number_reported() {
        let mut console = console();
        let reply = run(&mut console, "reset 4");
        assert_eq!(reply.lines, vec!["No prize number 4."]);
    }
}
