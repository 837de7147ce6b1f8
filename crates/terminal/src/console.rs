//! Read commands, apply them, print the operator prompt.

use std::io::{BufRead, Write};

use anyhow::Context;
use chrono::Utc;
use tracing::debug;

use floorscan_core::{ScanError, ScanResult};
use floorscan_events::{EventBus, EventEnvelope, FloorEvent};
use floorscan_infra::{InventoryService, ScanTerminal};
use floorscan_scan::ScanToken;
use floorscan_verification::{CompositeCodeInterpreter, Outcome};

use crate::command::Command;

pub enum Session<S, B> {
    /// Task-driven or ad hoc floor work (PICK, COUNT, RECEIVE, MOVE, REPLENISH).
    Floor(ScanTerminal<S, B>),
    /// Packing verification of one order.
    Pack(CompositeCodeInterpreter),
}

pub struct Console<S, B> {
    session: Session<S, B>,
}

impl<S, B> Console<S, B>
where
    S: InventoryService,
    B: EventBus<EventEnvelope<FloorEvent>>,
{
    pub fn new(session: Session<S, B>) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &Session<S, B> {
        &self.session
    }

    /// Process lines until `:quit` or end of input.
    pub fn run(&mut self, input: impl BufRead, mut out: impl Write) -> anyhow::Result<()> {
        writeln!(out, "{}", self.prompt()).context("writing prompt")?;
        for line in input.lines() {
            let line = line.context("reading operator input")?;
            let reply = match Command::parse(&line) {
                Ok(None) => continue,
                Ok(Some(Command::Quit)) => break,
                Ok(Some(command)) => self.apply(command),
                Err(err) => format!("x {err}\n{}", self.prompt()),
            };
            writeln!(out, "{reply}").context("writing reply")?;
        }
        Ok(())
    }

    fn prompt(&self) -> String {
        match &self.session {
            Session::Floor(terminal) => terminal.prompt().to_string(),
            Session::Pack(packer) => {
                let open: Vec<String> = packer
                    .order()
                    .lines
                    .iter()
                    .filter(|l| !l.is_complete())
                    .map(|l| format!("{} {}/{}", l.product_code, l.packed_qty, l.required_qty))
                    .collect();
                if open.is_empty() {
                    format!("Order {} packed", packer.order().order_id)
                } else {
                    format!("Pack: {}", open.join(", "))
                }
            }
        }
    }

    fn apply(&mut self, command: Command) -> String {
        debug!(?command, "operator command");
        match &mut self.session {
            Session::Floor(terminal) => {
                let result = match command {
                    Command::Scan(raw) => terminal.scan(&ScanToken::manual(raw, Utc::now())),
                    Command::Quantity { qty, confirm_override } => {
                        terminal.enter_quantity(qty, confirm_override)
                    }
                    Command::Lot(index) => terminal.select_lot(index),
                    Command::Short(found) => terminal.short_pick(found),
                    Command::Cancel => terminal.cancel(),
                    Command::Retry => terminal.retry(),
                    Command::Prompt | Command::Quit => return self.prompt(),
                };
                self.render(result)
            }
            Session::Pack(packer) => match command {
                Command::Scan(raw) => match packer.scan(&ScanToken::manual(raw, Utc::now())) {
                    Ok(packed) => {
                        let line = format!(
                            "+ {} {}/{}{}",
                            packed.product_code,
                            packed.packed_qty,
                            packed.required_qty,
                            if packed.line_complete { " complete" } else { "" }
                        );
                        format!("{line}\n{}", self.prompt())
                    }
                    Err(err) => self.render(Err(err)),
                },
                Command::Prompt | Command::Quit => self.prompt(),
                _ => format!("x not available while packing\n{}", self.prompt()),
            },
        }
    }

    fn render(&self, result: ScanResult<Outcome>) -> String {
        let mut lines = Vec::new();
        match result {
            Ok(outcome) => {
                lines.extend(outcome.warnings.iter().map(notice));
                lines.push(outcome.prompt.to_string());
            }
            Err(err) => {
                lines.push(format!("x {}: {err}", err.code()));
                lines.push(self.prompt());
            }
        }
        lines.join("\n")
    }
}

fn notice(warning: &ScanError) -> String {
    format!("! {}: {warning}", warning.code())
}
